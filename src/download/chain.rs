//! Per-DOI fallback chain.
//!
//! Mirrors are tried one at a time in order. A mirror fails on a non-200
//! page, a page without a PDF link, a failed PDF request or a payload the
//! validator rejects. Between two mirror attempts the chain pauses; there is
//! no pause before the first mirror or after the last. Once every mirror has
//! failed the open-access lookup is tried, and its payload goes through the
//! same write and validation path. The first source that succeeds wins.

use reqwest::header::HeaderMap;
use std::sync::Arc;

use crate::config::{Config, Mirror, MirrorList};
use crate::models::{
    AttemptFailure, Doi, DownloadRecord, DownloadSource, ValidationOutcome,
};
use crate::sources::{Fetcher, OpenAccessLookup, SourceError, UnpaywallSource};
use crate::utils::{
    resolve_pdf_url, ContentValidator, DelayScheduler, HttpClient, PdfLinkExtractor,
    RandomDelay, SniffValidator,
};

use super::OutputDir;

/// Where a DOI is in the fallback sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    Pending,
    /// Trying the mirror at this index
    TryingMirror(usize),
    /// The mirror at this index failed
    NextMirror(usize),
    MirrorsExhausted,
    TryingOpenAccess,
    Succeeded(DownloadRecord),
    Failed,
}

impl ChainState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainState::Succeeded(_) | ChainState::Failed)
    }
}

/// Final result of running the chain for one DOI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Succeeded(DownloadRecord),
    /// Every source failed; one entry per source tried, in order
    Failed { attempts: Vec<AttemptFailure> },
}

impl ChainOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ChainOutcome::Succeeded(_))
    }
}

/// Sequences mirrors, then the open-access lookup, for a single DOI
#[derive(Debug, Clone)]
pub struct FallbackChain {
    fetcher: Arc<dyn Fetcher>,
    validator: Arc<dyn ContentValidator>,
    open_access: Option<Arc<dyn OpenAccessLookup>>,
    delay: Arc<dyn DelayScheduler>,
    extractor: PdfLinkExtractor,
    mirrors: MirrorList,
    output: OutputDir,
}

impl FallbackChain {
    /// Chain with the default validator and delay, and no open-access step
    pub fn new(fetcher: Arc<dyn Fetcher>, mirrors: MirrorList, output: OutputDir) -> Self {
        Self {
            fetcher,
            validator: Arc::new(SniffValidator::new()),
            open_access: None,
            delay: Arc::new(RandomDelay::default()),
            extractor: PdfLinkExtractor::new(),
            mirrors,
            output,
        }
    }

    /// Build the production chain from configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let mut client = HttpClient::with_timeout(config.http.timeout())?
            .bypass_proxy(config.http.bypass_proxy());
        if !config.http.user_agents.is_empty() {
            client = client.user_agents(config.http.user_agents.clone());
        }
        let client = Arc::new(client);

        let validator = SniffValidator::with_limits(
            config.validation.min_size_bytes,
            config.validation.sniff_window_bytes,
        );

        let mut chain = Self::new(
            client.clone(),
            config.mirror_list(),
            OutputDir::new(&config.downloads.output_dir),
        )
        .with_validator(Arc::new(validator))
        .with_delay(Arc::new(RandomDelay::new(config.delay.range())));

        if config.open_access.enabled {
            let lookup = UnpaywallSource::new(client, config.open_access.email.clone())
                .with_base_url(config.open_access.api_base.clone());
            chain = chain.with_open_access(Arc::new(lookup));
        }

        Ok(chain)
    }

    pub fn with_validator(mut self, validator: Arc<dyn ContentValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn DelayScheduler>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_open_access(mut self, lookup: Arc<dyn OpenAccessLookup>) -> Self {
        self.open_access = Some(lookup);
        self
    }

    pub fn mirrors(&self) -> &MirrorList {
        &self.mirrors
    }

    pub fn output(&self) -> &OutputDir {
        &self.output
    }

    pub fn has_open_access(&self) -> bool {
        self.open_access.is_some()
    }

    /// Run the chain to completion for one DOI
    pub async fn run(&self, doi: &Doi) -> ChainOutcome {
        let mut attempts = Vec::new();
        let mut state = ChainState::Pending;

        loop {
            state = match state {
                ChainState::Pending => {
                    if self.mirrors.is_empty() {
                        ChainState::MirrorsExhausted
                    } else {
                        ChainState::TryingMirror(0)
                    }
                }
                ChainState::TryingMirror(index) => match self.mirrors.get(index) {
                    Some(mirror) => {
                        tracing::info!("Trying mirror: {}", mirror);
                        match self.try_mirror(doi, mirror).await {
                            Ok(record) => ChainState::Succeeded(record),
                            Err(e) => {
                                tracing::warn!("Mirror {} failed for DOI {}: {}", mirror, doi, e);
                                attempts.push(failure(
                                    DownloadSource::Mirror(mirror.base_url().to_string()),
                                    &e,
                                ));
                                ChainState::NextMirror(index)
                            }
                        }
                    }
                    None => ChainState::MirrorsExhausted,
                },
                ChainState::NextMirror(index) => {
                    if index + 1 < self.mirrors.len() {
                        tracing::info!("Trying next mirror for DOI {}", doi);
                        self.delay.pause().await;
                        ChainState::TryingMirror(index + 1)
                    } else {
                        ChainState::MirrorsExhausted
                    }
                }
                ChainState::MirrorsExhausted => {
                    if self.open_access.is_some() {
                        tracing::info!("All mirrors failed. Checking open access sources...");
                        ChainState::TryingOpenAccess
                    } else {
                        tracing::info!("All mirrors failed for DOI {}", doi);
                        ChainState::Failed
                    }
                }
                ChainState::TryingOpenAccess => match self.try_open_access(doi).await {
                    Ok(record) => ChainState::Succeeded(record),
                    Err(e) => {
                        tracing::warn!("Open access download failed for DOI {}: {}", doi, e);
                        attempts.push(failure(DownloadSource::OpenAccess, &e));
                        ChainState::Failed
                    }
                },
                ChainState::Succeeded(record) => return ChainOutcome::Succeeded(record),
                ChainState::Failed => return ChainOutcome::Failed { attempts },
            };
        }
    }

    async fn try_mirror(&self, doi: &Doi, mirror: &Mirror) -> Result<DownloadRecord, SourceError> {
        // One client identity for the page and the PDF behind it
        let headers = self.fetcher.headers();

        let page = self.fetcher.fetch(&mirror.url_for(doi), &headers).await?;
        if !page.is_ok() {
            return Err(SourceError::Status {
                url: page.url,
                status: page.status,
            });
        }

        let candidate = self
            .extractor
            .extract(&page.text())
            .ok_or_else(|| SourceError::NoPdfLink(format!("no PDF found for DOI {}", doi)))?;
        tracing::debug!("Found PDF link via {}: {}", candidate.heuristic, candidate.url);

        let pdf_url = resolve_pdf_url(&candidate.url, mirror.base_url());
        self.download(
            doi,
            &pdf_url,
            &headers,
            DownloadSource::Mirror(mirror.base_url().to_string()),
        )
        .await
    }

    async fn try_open_access(&self, doi: &Doi) -> Result<DownloadRecord, SourceError> {
        let lookup = self.open_access.as_ref().ok_or_else(|| {
            SourceError::OpenAccessUnavailable("no open access lookup configured".to_string())
        })?;

        let pdf_url = lookup.resolve_pdf_url(doi).await?.ok_or_else(|| {
            SourceError::OpenAccessUnavailable(format!(
                "no open access PDF found for DOI {} via {}",
                doi,
                lookup.id()
            ))
        })?;

        let headers = self.fetcher.headers();
        self.download(doi, &pdf_url, &headers, DownloadSource::OpenAccess)
            .await
    }

    /// Fetch a PDF, write it, and keep it only if validation accepts it
    async fn download(
        &self,
        doi: &Doi,
        pdf_url: &str,
        headers: &HeaderMap,
        source: DownloadSource,
    ) -> Result<DownloadRecord, SourceError> {
        tracing::info!("Downloading PDF from: {}", pdf_url);
        let response = self.fetcher.fetch(pdf_url, headers).await?;
        if !response.is_ok() {
            return Err(SourceError::Status {
                url: response.url,
                status: response.status,
            });
        }

        let path = self.output.write(doi, &response.body).await?;

        match self
            .validator
            .validate(&response.body, response.content_type.as_deref(), pdf_url)
        {
            ValidationOutcome::RejectAsHtml => {
                self.output.remove(&path).await?;
                Err(SourceError::ContentRejected(
                    "downloaded file appears to be HTML, not a PDF".to_string(),
                ))
            }
            ValidationOutcome::Accept { warnings } => {
                for warning in &warnings {
                    tracing::warn!("DOI {}: {}", doi, warning);
                }
                tracing::info!("Successfully downloaded: {}", path.display());
                Ok(DownloadRecord {
                    doi: doi.clone(),
                    source,
                    path,
                    bytes: response.body.len() as u64,
                    warnings,
                })
            }
        }
    }
}

fn failure(source: DownloadSource, error: &SourceError) -> AttemptFailure {
    AttemptFailure {
        source,
        kind: error.kind(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use crate::sources::{MockFetcher, MockOpenAccess};
    use crate::utils::NoDelay;
    use tempfile::{tempdir, TempDir};

    const M1: &str = "https://m1.example/";
    const M2: &str = "https://m2.example/";
    const M3: &str = "https://m3.example/";

    struct Harness {
        fetcher: Arc<MockFetcher>,
        open_access: Arc<MockOpenAccess>,
        delay: Arc<NoDelay>,
        dir: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                fetcher: Arc::new(MockFetcher::new()),
                open_access: Arc::new(MockOpenAccess::new()),
                delay: Arc::new(NoDelay::new()),
                dir: tempdir().unwrap(),
            }
        }

        fn chain(&self, mirrors: &[&str]) -> FallbackChain {
            FallbackChain::new(
                self.fetcher.clone(),
                MirrorList::exact(mirrors),
                OutputDir::new(self.dir.path().join("papers")),
            )
            .with_delay(self.delay.clone())
            .with_open_access(self.open_access.clone())
        }

        fn pdf_count(&self) -> usize {
            std::fs::read_dir(self.dir.path().join("papers"))
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    #[tokio::test]
    async fn test_second_mirror_succeeds() {
        let h = Harness::new();
        let doi = Doi::normalize("10.1/abc");
        h.fetcher.respond(&format!("{}10.1/abc", M1), 500, "oops");
        h.fetcher.respond_html(
            &format!("{}10.1/abc", M2),
            r#"<html><iframe src="/files/abc.pdf"></iframe></html>"#,
        );
        h.fetcher.respond_pdf("https://m2.example/files/abc.pdf", 20_000);

        let outcome = h.chain(&[M1, M2, M3]).run(&doi).await;

        let ChainOutcome::Succeeded(record) = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(record.source, DownloadSource::Mirror(M2.to_string()));
        assert_eq!(record.bytes, 20_000);
        assert!(record.warnings.is_empty());
        assert_eq!(record.path.file_name().unwrap(), "10.1_abc.pdf");
        assert!(record.path.exists());

        // The third mirror is never contacted
        assert_eq!(h.fetcher.count_prefix(M3), 0);
        assert_eq!(h.delay.pauses(), 1);
        assert!(h.open_access.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_first_mirror_success_skips_delay() {
        let h = Harness::new();
        let doi = Doi::normalize("10.1/abc");
        h.fetcher.respond_html(
            &format!("{}10.1/abc", M1),
            r#"<a href="https://cdn.example/abc.pdf">PDF</a>"#,
        );
        h.fetcher.respond_pdf("https://cdn.example/abc.pdf", 12_000);

        let outcome = h.chain(&[M1, M2]).run(&doi).await;
        assert!(outcome.is_success());
        assert_eq!(h.delay.pauses(), 0);
        assert_eq!(h.fetcher.count_prefix(M2), 0);
    }

    #[tokio::test]
    async fn test_all_mirrors_fail_then_open_access() {
        let h = Harness::new();
        let doi = Doi::normalize("10.1/oa");
        h.fetcher.fail(&format!("{}10.1/oa", M1), "connection reset");
        h.fetcher.respond_html(&format!("{}10.1/oa", M2), "<html><p>nothing here</p></html>");
        h.open_access.answer("10.1/oa", "https://repo.example/oa.pdf");
        h.fetcher.respond_pdf("https://repo.example/oa.pdf", 30_000);

        let outcome = h.chain(&[M1, M2]).run(&doi).await;

        let ChainOutcome::Succeeded(record) = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(record.source, DownloadSource::OpenAccess);
        assert_eq!(h.open_access.lookups(), vec!["10.1/oa".to_string()]);
        // A pause between the two mirrors only
        assert_eq!(h.delay.pauses(), 1);
    }

    #[tokio::test]
    async fn test_everything_fails() {
        let h = Harness::new();
        let doi = Doi::normalize("10.1/none");

        let outcome = h.chain(&[M1, M2, M3]).run(&doi).await;

        let ChainOutcome::Failed { attempts } = outcome else {
            panic!("expected failure");
        };
        let kinds: Vec<FailureKind> = attempts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FailureKind::NonSuccessStatus,
                FailureKind::NonSuccessStatus,
                FailureKind::NonSuccessStatus,
                FailureKind::OpenAccessUnavailable,
            ]
        );
        assert_eq!(attempts[0].source, DownloadSource::Mirror(M1.to_string()));
        assert_eq!(h.delay.pauses(), 2);
        assert_eq!(h.open_access.lookups().len(), 1);
        assert_eq!(h.pdf_count(), 0);
    }

    #[tokio::test]
    async fn test_html_payload_is_rejected_and_removed() {
        let h = Harness::new();
        let doi = Doi::normalize("10.1/html");
        h.fetcher.respond_html(
            &format!("{}10.1/html", M1),
            r#"<embed src="//cdn.example/html.pdf">"#,
        );
        h.fetcher.respond(
            "https://cdn.example/html.pdf",
            200,
            "<!DOCTYPE html><html><body>captcha</body></html>",
        );

        let outcome = h.chain(&[M1]).run(&doi).await;

        let ChainOutcome::Failed { attempts } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(attempts[0].kind, FailureKind::ContentRejected);
        assert!(!h
            .dir
            .path()
            .join("papers")
            .join("10.1_html.pdf")
            .exists());
    }

    #[tokio::test]
    async fn test_small_pdf_is_kept_with_warning() {
        let h = Harness::new();
        let doi = Doi::normalize("10.1/small");
        h.fetcher.respond_html(
            &format!("{}10.1/small", M1),
            r#"<div id="download"><a href="get/small">Save</a></div>"#,
        );
        h.fetcher.respond_pdf("https://m1.example/get/small", 2_000);

        let outcome = h.chain(&[M1]).run(&doi).await;

        let ChainOutcome::Succeeded(record) = outcome else {
            panic!("expected success");
        };
        assert_eq!(record.bytes, 2_000);
        assert!(record
            .warnings
            .contains(&crate::models::ValidationWarning::SmallFile { bytes: 2_000 }));
    }

    #[tokio::test]
    async fn test_page_and_pdf_share_a_request_sequence() {
        let h = Harness::new();
        let doi = Doi::normalize("10.1/seq");
        h.fetcher.respond_html(
            &format!("{}10.1/seq", M1),
            r#"<iframe src="files/seq.pdf"></iframe>"#,
        );

        let outcome = h.chain(&[M1]).run(&doi).await;
        assert!(!outcome.is_success());
        assert_eq!(
            h.fetcher.requests(),
            vec![
                "https://m1.example/10.1/seq".to_string(),
                "https://m1.example/files/seq.pdf".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_without_open_access() {
        let h = Harness::new();
        let doi = Doi::normalize("10.1/x");
        let chain = FallbackChain::new(
            h.fetcher.clone(),
            MirrorList::exact([M1]),
            OutputDir::new(h.dir.path().join("papers")),
        )
        .with_delay(h.delay.clone());

        let outcome = chain.run(&doi).await;
        let ChainOutcome::Failed { attempts } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(attempts.len(), 1);
        assert!(h.open_access.lookups().is_empty());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ChainState::Failed.is_terminal());
        assert!(!ChainState::TryingMirror(0).is_terminal());
        assert!(!ChainState::MirrorsExhausted.is_terminal());
    }
}
