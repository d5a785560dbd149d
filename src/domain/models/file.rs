use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Raw bytes of a file supplied by the caller of an upload session. Cloning
/// shares the underlying buffer.
#[derive(Debug, Clone)]
pub struct FileData {
    pub content: Bytes,
    pub filename: String,
    pub mime_type: String,
}

impl FileData {
    pub fn new(content: impl Into<Bytes>, filename: String, mime_type: String) -> Self {
        Self {
            content: content.into(),
            filename,
            mime_type,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Base64 payload of a [`FileData`], shaped as a bulk-upload item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncodedFile {
    pub filename: String,
    pub content: String,
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_content_buffer() {
        let file = FileData::new(
            vec![0u8; 4096],
            "poster.psd".to_string(),
            "image/vnd.adobe.photoshop".to_string(),
        );
        let copy = file.clone();

        assert_eq!(copy.size(), 4096);
        assert_eq!(file.content.as_ptr(), copy.content.as_ptr());
    }
}
