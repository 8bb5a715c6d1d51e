use crate::{Result, SessionError};
use std::collections::VecDeque;

/// Speech-to-text seam. An empty string means nothing was understood.
pub trait Transcriber: Send {
    fn transcribe(&mut self, audio: &[u8]) -> Result<String>;
}

/// Returns queued transcripts in order, then fails.
#[derive(Debug, Default)]
pub struct MockTranscriber {
    transcripts: VecDeque<String>,
}

impl MockTranscriber {
    pub fn new<I, S>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transcripts: transcripts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.transcripts.len()
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&mut self, audio: &[u8]) -> Result<String> {
        tracing::debug!(bytes = audio.len(), "mock transcription");
        self.transcripts
            .pop_front()
            .ok_or_else(|| SessionError::Transcription("no transcript queued".to_string()))
    }
}

/// Treats the audio buffer as an already transcribed UTF-8 utterance.
///
/// Lets an external recognizer pipe its output straight into a session.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextTranscriber;

impl Transcriber for TextTranscriber {
    fn transcribe(&mut self, audio: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(audio)
            .map_err(|e| SessionError::Transcription(format!("not UTF-8: {e}")))?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_queue() {
        let mut mock = MockTranscriber::new(["nyalakan lampu", ""]);
        assert_eq!(mock.remaining(), 2);
        assert_eq!(mock.transcribe(&[0; 16]).unwrap(), "nyalakan lampu");
        assert_eq!(mock.transcribe(&[]).unwrap(), "");
        assert!(matches!(mock.transcribe(&[]), Err(SessionError::Transcription(_))));
    }

    #[test]
    fn test_text_transcriber() {
        let mut text = TextTranscriber;
        assert_eq!(text.transcribe(b"  belok kiri\n").unwrap(), "belok kiri");
        assert!(text.transcribe(&[0xff, 0xfe]).is_err());
    }
}
