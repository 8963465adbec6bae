//! Reply generation providers

mod gemini;

pub use gemini::GeminiGenerator;
