use std::time::Duration;

/// Why a probe could not measure the target. Never surfaced to callers.
#[derive(Debug, thiserror::Error)]
#[error("size probe failed: {0}")]
pub struct ProbeFailure(#[from] reqwest::Error);

/// One-shot GET used to guess whether a site is cheap enough to process inline.
#[derive(Debug, Clone)]
pub struct SizeProbe {
    client: reqwest::Client,
    threshold: u64,
}

impl SizeProbe {
    /// `read_timeout` bounds the transfer after the connection is up, so the
    /// whole probe takes at most `connect_timeout + read_timeout`.
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        threshold: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(connect_timeout + read_timeout)
            .build()?;
        Ok(Self { client, threshold })
    }

    /// Body length of a single GET to `url`. Not retried.
    pub async fn measure(&self, url: &str) -> Result<u64, ProbeFailure> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.len() as u64)
    }

    /// Strictly below the threshold counts as small. Any failure counts as
    /// not small.
    pub async fn is_small(&self, url: &str) -> bool {
        match self.measure(url).await {
            Ok(bytes) => {
                let small = bytes < self.threshold;
                tracing::debug!(%url, bytes, threshold = self.threshold, small, "probed site size");
                small
            }
            Err(err) => {
                tracing::info!(%url, error = %err, "probe failed, treating site as large");
                false
            }
        }
    }
}
