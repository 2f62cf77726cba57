pub mod cwa;
pub mod nlp;

pub use cwa::CwaClient;
pub use nlp::NlpClient;
