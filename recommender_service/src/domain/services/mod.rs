pub mod huggingface_embedding;
pub mod signature;
