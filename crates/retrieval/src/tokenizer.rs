use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

/// cl100k_base, the encoding the chat and embedding models share.
/// Building the encoder is expensive, so it is done once per process.
static BPE: Lazy<CoreBPE> = Lazy::new(|| {
    tiktoken_rs::cl100k_base().expect("cl100k_base encoding is embedded in the binary")
});

pub fn count_tokens(text: &str) -> usize {
    BPE.encode_ordinary(text).len()
}
