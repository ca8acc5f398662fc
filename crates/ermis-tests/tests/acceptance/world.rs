//! Per-scenario context.

use ermis_tests::config::Config;
use ermis_tests::credentials::TokenStash;
use ermis_tests::fixtures::{AliasList, AliasLookup, AliasObject, ApiResponse, ErmisClient};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Configuration and client shared by every scenario of the run.
#[derive(Debug)]
pub struct Suite {
    pub config: Config,
    pub client: ErmisClient,
}

static SUITE: OnceLock<Suite> = OnceLock::new();

/// Make the suite available to scenario worlds. Call once, before running.
pub fn install(config: Config, client: ErmisClient) -> anyhow::Result<()> {
    SUITE
        .set(Suite { config, client })
        .map_err(|_| anyhow::anyhow!("suite already installed"))
}

/// State of one scenario.
///
/// Holds the last response so "then" steps can assert on what the "when"
/// step got back.
#[derive(Debug, cucumber::World)]
#[world(init = Self::new)]
pub struct ErmisWorld {
    suite: &'static Suite,

    /// Response of the most recent request.
    pub last_response: Option<ApiResponse>,

    /// Hostgroup chosen by `that we are "<role>" in the hostgroup`.
    pub hostgroup: Option<String>,

    /// Ticket cache discovered by `that we have a kerberos token`.
    pub ticket_cache: Option<PathBuf>,

    pub stash: TokenStash,
}

impl ErmisWorld {
    fn new() -> Self {
        let suite = SUITE
            .get()
            .expect("suite must be installed before the scenarios run");

        Self {
            suite,
            last_response: None,
            hostgroup: None,
            ticket_cache: None,
            stash: TokenStash::from_config(&suite.config),
        }
    }

    pub fn config(&self) -> &'static Config {
        &self.suite.config
    }

    pub fn client(&self) -> &'static ErmisClient {
        &self.suite.client
    }

    pub fn alias_name(&self) -> &'static str {
        &self.suite.config.test_alias
    }

    pub fn record(&mut self, response: ApiResponse) {
        self.last_response = Some(response);
    }

    pub fn last_response(&self) -> &ApiResponse {
        self.last_response
            .as_ref()
            .expect("no request has been made in this scenario")
    }

    /// GET the test alias, keeping the response as the latest one.
    async fn lookup_alias(&mut self) -> AliasLookup {
        let alias = self.alias_name();
        let lookup = self
            .client()
            .fetch_alias(alias)
            .await
            .unwrap_or_else(|e| panic!("GET {} failed: {}", alias, e));

        self.record(lookup.response.clone());
        lookup
    }

    pub async fn refetch_aliases(&mut self) -> AliasList {
        self.lookup_alias().await.aliases
    }

    /// Like [`Self::refetch_aliases`], but the alias has to be there.
    pub async fn refetch_alias(&mut self) -> AliasObject {
        self.lookup_alias()
            .await
            .into_object()
            .unwrap_or_else(|e| panic!("{}", e))
    }
}
