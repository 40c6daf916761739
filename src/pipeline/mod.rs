//! Pipeline stages for page extraction and merging.
//!
//! Each submodule implements one component. Rendering and structural copying
//! are separate stages so the rasterised fallback can be tested on its own,
//! and so the structural path never touches the renderer.
//!
//! ## Data Flow
//!
//! ```text
//!                      ┌──▶ thumbnail (gallery, previews)
//! load ──▶ render ─────┤
//! (bytes)  (pdfium)    └──▶ extract / merge ──▶ deliver
//!                             │  assemble (lopdf)
//!                             └─ structural copy, else rasterised pages
//! ```
//!
//! 1. [`load`]     : read a file into an owned buffer, check the `%PDF` magic
//! 2. [`render`]   : parse with pdfium and rasterise pages on a white
//!    background
//! 3. [`encode`]   : JPEG for previews, Flate-compressed RGB for embedding
//! 4. [`thumbnail`]: per-page gallery and the per-document preview cache
//! 5. [`assemble`] : build the output PDF from copied or rendered pages
//! 6. [`extract`] / [`merge`]: the two operations and their fallbacks
//! 7. [`deliver`]  : write the result locally, interactively or not

pub mod assemble;
pub mod deliver;
pub mod encode;
pub mod extract;
pub mod load;
pub mod merge;
pub mod render;
pub mod thumbnail;
