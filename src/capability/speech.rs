//! Speech synthesis client (Fish Audio TTS)

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use tracing::info;

use crate::config::SpeechSettings;
use crate::credentials::Secret;
use crate::error::{Error, Result};

use super::http::{Auth, HttpEndpoint};
use super::{Capability, CapabilityKind};

#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    /// Where the audio is written
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedAudio {
    pub path: PathBuf,
    pub bytes: usize,
}

#[derive(Debug, Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_id: Option<&'a str>,
}

pub struct FishAudioClient {
    endpoint: HttpEndpoint,
    format: String,
    reference_id: Option<String>,
}

impl FishAudioClient {
    pub fn new(settings: &SpeechSettings, api_key: &Secret) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(
                CapabilityKind::SpeechSynthesis,
                &settings.base_url,
                settings.timeout_secs,
                Auth::Bearer(api_key.clone()),
            )?,
            format: settings.format.clone(),
            reference_id: settings.reference_id.clone(),
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

#[async_trait]
impl Capability for FishAudioClient {
    type Request = SpeechRequest;
    type Response = SynthesizedAudio;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::SpeechSynthesis
    }

    async fn invoke(&self, request: SpeechRequest) -> Result<SynthesizedAudio> {
        let body = TtsBody {
            text: &request.text,
            format: &self.format,
            reference_id: self.reference_id.as_deref(),
        };
        let url = self.endpoint.url("v1/tts");
        let audio = self
            .endpoint
            .send_bytes(self.endpoint.request(Method::POST, &url).json(&body))
            .await?;

        if audio.is_empty() {
            return Err(Error::malformed(CapabilityKind::SpeechSynthesis, "empty audio body"));
        }

        if let Some(parent) = request.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| Error::IoWrite { path: parent.to_path_buf(), source })?;
            }
        }
        tokio::fs::write(&request.output_path, &audio)
            .await
            .map_err(|source| Error::IoWrite { path: request.output_path.clone(), source })?;

        info!(path = %request.output_path.display(), bytes = audio.len(), "Audio written");
        Ok(SynthesizedAudio {
            path: request.output_path,
            bytes: audio.len(),
        })
    }
}
