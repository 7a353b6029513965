use crate::connectivity::domain::normalize_domain;
use crate::utils::errors::{CertSyncError, Result};
use reqwest::{Certificate, Client, StatusCode};
use std::error::Error as _;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use trust_dns_resolver::TokioAsyncResolver;

/// How much the tester prints. Never changes the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    #[default]
    Normal,
    Verbose,
    Debug,
}

#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub domain: String,
    pub addresses: Vec<IpAddr>,
    pub status: StatusCode,
}

/// HTTPS handshake check anchored only on the guest trust bundle
pub struct ConnectivityTester {
    trust_bundle: PathBuf,
    timeout: Duration,
    verbosity: Verbosity,
}

impl ConnectivityTester {
    pub fn new(trust_bundle: &Path, timeout: Duration, verbosity: Verbosity) -> Self {
        Self {
            trust_bundle: trust_bundle.to_path_buf(),
            timeout,
            verbosity,
        }
    }

    /// Load every certificate of the trust bundle as a root
    pub fn load_anchors(&self) -> Result<Vec<Certificate>> {
        let pem = fs::read(&self.trust_bundle).map_err(|e| {
            CertSyncError::NetworkTest(format!(
                "cannot read trust bundle {}: {e}",
                self.trust_bundle.display()
            ))
        })?;
        let anchors = Certificate::from_pem_bundle(&pem).map_err(|e| {
            CertSyncError::NetworkTest(format!(
                "invalid trust bundle {}: {e}",
                self.trust_bundle.display()
            ))
        })?;
        if anchors.is_empty() {
            return Err(CertSyncError::NetworkTest(format!(
                "trust bundle {} contains no certificates",
                self.trust_bundle.display()
            )));
        }
        Ok(anchors)
    }

    /// Client that trusts the bundle and nothing else
    pub fn build_client(&self) -> Result<Client> {
        let anchors = self.load_anchors()?;
        if self.verbosity == Verbosity::Debug {
            println!(
                "Loaded {} trust anchors from {}",
                anchors.len(),
                self.trust_bundle.display()
            );
        }

        let mut builder = Client::builder()
            .timeout(self.timeout)
            .use_rustls_tls()
            .tls_built_in_root_certs(false);
        for anchor in anchors {
            builder = builder.add_root_certificate(anchor);
        }
        Ok(builder.build()?)
    }

    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
            CertSyncError::NetworkTest(format!("failed to create DNS resolver: {e}"))
        })?;

        let lookup = tokio::time::timeout(self.timeout, resolver.lookup_ip(domain))
            .await
            .map_err(|_| {
                CertSyncError::NetworkTest(format!("DNS resolution for {domain} timed out"))
            })?
            .map_err(|e| {
                CertSyncError::NetworkTest(format!("DNS resolution failed for {domain}: {e}"))
            })?;

        Ok(lookup.iter().collect())
    }

    /// Validate the domain, resolve it, then attempt `GET https://<domain>/`.
    /// Any HTTP status counts as a pass once the handshake succeeded.
    pub async fn run(&self, input: &str) -> Result<TestOutcome> {
        let domain = normalize_domain(input)?;
        let client = self.build_client()?;

        let addresses = self.resolve(&domain).await?;
        if self.verbosity >= Verbosity::Verbose {
            let listed: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
            println!("Resolved {domain}: {}", listed.join(", "));
        }

        let url = format!("https://{domain}/");
        tracing::debug!("Requesting {url} with timeout {:?}", self.timeout);

        let response = client.get(&url).send().await.map_err(|e| {
            if self.verbosity == Verbosity::Debug {
                let mut source = e.source();
                while let Some(cause) = source {
                    println!("  caused by: {cause}");
                    source = cause.source();
                }
            }
            let kind = if e.is_timeout() {
                "timed out"
            } else {
                "TLS handshake or certificate validation failed"
            };
            CertSyncError::NetworkTest(format!("connection to {domain} {kind}: {e}"))
        })?;

        let outcome = TestOutcome {
            domain,
            addresses,
            status: response.status(),
        };
        self.report(&outcome);
        Ok(outcome)
    }

    fn report(&self, outcome: &TestOutcome) {
        println!("PASS: certificate of {} verified", outcome.domain);
        if self.verbosity >= Verbosity::Verbose {
            println!("HTTP status: {}", outcome.status);
        }
    }
}
