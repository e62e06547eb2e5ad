//! Document tools

mod pdf;

pub use pdf::DownloadPdfText;
