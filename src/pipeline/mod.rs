//! Pipeline stages for PDF → page images → RAG text.
//!
//! Each submodule implements one step and is tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! stage 1:  layout ──▶ render
//!           (pdfs/)    (pdfium → images/<doc>/<n>.png)
//!
//! stage 2:  layout ──▶ encode ──▶ llm ──▶ sink
//!           (pages)    (base64)   (VLM)   (rags/<doc>.txt)
//! ```
//!
//! 1. [`layout`]: directory discovery and page ordering
//! 2. [`render`]: rasterise PDFs; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]: page file → base64 payload and data URI
//! 4. [`llm`]: the [`llm::VisionClient`] seam and the rate-limit
//!    policy; [`responses`] and [`provider`] are the shipped clients
//! 5. [`sink`]: output reset and per-section append

pub mod encode;
pub mod layout;
pub mod llm;
pub mod provider;
pub mod render;
pub mod responses;
pub mod sink;
