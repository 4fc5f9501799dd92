//! Concrete [`ots_core::collaborators`] backends: the parts explicitly
//! placed outside the proof engine.
//!
//! Two verification strategies exist for a block-anchored chain: a
//! full-node RPC path that can see the coinbase transaction's OP_RETURN
//! outputs (and so can confirm the commitment sits in its canonical slot),
//! and a block-explorer/Electrum path that only has the serialized header
//! and can at best confirm the commitment appears somewhere in those bytes
//! — a degraded, non-canonical match.

use async_trait::async_trait;
use ots_core::collaborators::{Cache, Calendar, ChainRpc, CollabResult, CommitmentLocation, EthereumRpc};
use ots_core::verifier::VerifyContext;

use crate::calendar::CalendarClient;
use crate::cache::{FileCache, MemoryCache};
use crate::config::Config;
use crate::error::{Error, Result};

fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Electrum-backed chain RPC: sees block headers only, never full transactions
///
/// Used for both Bitcoin and Litecoin (the Electrum protocol is the same
/// shape for either); a match here can never be a [`CommitmentLocation::CanonicalSlot`].
#[cfg(feature = "electrum")]
pub struct ElectrumChainRpc {
    server: String,
}

#[cfg(feature = "electrum")]
impl ElectrumChainRpc {
    /// Connect against `server`, or the Bitcoin mainnet default if `None`
    #[must_use]
    pub fn new(server: Option<String>) -> Self {
        Self { server: server.unwrap_or_else(|| "tcp://electrum.blockstream.info:50001".to_string()) }
    }

    async fn header_bytes(&self, height: u64) -> Result<(Vec<u8>, u32)> {
        use electrum_client::ElectrumApi;

        let server = self.server.clone();
        let header = tokio::task::spawn_blocking(move || {
            let client = electrum_client::Client::new(&server)
                .map_err(|e| Error::Verification(format!("connecting to Electrum: {e}")))?;
            client
                .block_header(height as usize)
                .map_err(|e| Error::Verification(format!("fetching block header: {e}")))
        })
        .await
        .map_err(|e| Error::Verification(format!("task join error: {e}")))??;

        Ok((bitcoin_block_header_bytes(&header), header.time))
    }
}

#[cfg(feature = "electrum")]
fn bitcoin_block_header_bytes(header: &electrum_client::bitcoin::block::Header) -> Vec<u8> {
    use electrum_client::bitcoin::consensus::Encodable;
    let mut out = Vec::with_capacity(80);
    header.consensus_encode(&mut out).expect("writing to a Vec never fails");
    out
}

#[cfg(feature = "electrum")]
#[async_trait]
impl ChainRpc for ElectrumChainRpc {
    async fn find_commitment(&self, height: u64, commitment: &[u8]) -> CollabResult<CommitmentLocation> {
        let (bytes, _) = self.header_bytes(height).await.map_err(|e| e.to_string())?;
        Ok(if contains_subsequence(&bytes, commitment) {
            CommitmentLocation::RawBytes
        } else {
            CommitmentLocation::NotFound
        })
    }

    async fn block_time(&self, height: u64) -> CollabResult<u64> {
        let (_, time) = self.header_bytes(height).await.map_err(|e| e.to_string())?;
        Ok(u64::from(time))
    }

    async fn block_id(&self, height: u64) -> CollabResult<String> {
        Ok(format!("block at height {height} (header-only backend)"))
    }
}

/// Full-node RPC chain backend: scans the coinbase transaction's OP_RETURN
/// outputs for the commitment, the canonical slot for a block attestation
#[cfg(feature = "rpc")]
pub struct BitcoinCoreChainRpc {
    client: bitcoincore_rpc::Client,
}

#[cfg(feature = "rpc")]
impl BitcoinCoreChainRpc {
    /// Connect to a full node at `url` with the given credentials
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC client cannot be constructed.
    pub fn new(url: &str, user: &str, password: &str) -> std::result::Result<Self, bitcoincore_rpc::Error> {
        use bitcoincore_rpc::Auth;
        let client = bitcoincore_rpc::Client::new(url, Auth::UserPass(user.to_string(), password.to_string()))?;
        Ok(Self { client })
    }

    fn fetch_block(&self, height: u64) -> Result<bitcoincore_rpc::bitcoin::Block> {
        use bitcoincore_rpc::RpcApi;
        let hash = self
            .client
            .get_block_hash(height)
            .map_err(|e| Error::Verification(format!("get_block_hash({height}): {e}")))?;
        self.client.get_block(&hash).map_err(|e| Error::Verification(format!("get_block: {e}")))
    }
}

#[cfg(feature = "rpc")]
#[async_trait]
impl ChainRpc for BitcoinCoreChainRpc {
    async fn find_commitment(&self, height: u64, commitment: &[u8]) -> CollabResult<CommitmentLocation> {
        let commitment = commitment.to_vec();
        let block = tokio::task::block_in_place(|| self.fetch_block(height)).map_err(|e| e.to_string())?;

        let Some(coinbase) = block.txdata.first() else {
            return Ok(CommitmentLocation::NotFound);
        };
        for output in &coinbase.output {
            let script_bytes = output.script_pubkey.as_bytes();
            if script_bytes.first() == Some(&0x6a) && contains_subsequence(script_bytes, &commitment) {
                return Ok(CommitmentLocation::CanonicalSlot);
            }
        }

        let mut raw = Vec::new();
        for tx in &block.txdata {
            use bitcoincore_rpc::bitcoin::consensus::Encodable;
            tx.consensus_encode(&mut raw).ok();
        }
        Ok(if contains_subsequence(&raw, &commitment) {
            CommitmentLocation::RawBytes
        } else {
            CommitmentLocation::NotFound
        })
    }

    async fn block_time(&self, height: u64) -> CollabResult<u64> {
        let block = tokio::task::block_in_place(|| self.fetch_block(height)).map_err(|e| e.to_string())?;
        Ok(u64::from(block.header.time))
    }

    async fn block_id(&self, height: u64) -> CollabResult<String> {
        let block = tokio::task::block_in_place(|| self.fetch_block(height)).map_err(|e| e.to_string())?;
        Ok(block.block_hash().to_string())
    }
}

/// Ethereum transaction lookups over a JSON-RPC HTTP endpoint
pub struct EthereumHttpRpc {
    client: reqwest::Client,
    rpc_url: String,
}

impl EthereumHttpRpc {
    /// Point at a JSON-RPC endpoint (e.g. an Infura/Alchemy URL)
    #[must_use]
    pub fn new(rpc_url: String) -> Self {
        Self { client: reqwest::Client::new(), rpc_url }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: serde_json::Value = self.client.post(&self.rpc_url).json(&body).send().await?.json().await?;
        response
            .get("result")
            .cloned()
            .ok_or_else(|| Error::Verification(format!("{method}: no result in response")))
    }
}

#[async_trait]
impl EthereumRpc for EthereumHttpRpc {
    async fn find_commitment(&self, tx_hash: [u8; 32], commitment: &[u8]) -> CollabResult<CommitmentLocation> {
        let result = self
            .call("eth_getTransactionByHash", serde_json::json!([format!("0x{}", hex::encode(tx_hash))]))
            .await
            .map_err(|e| e.to_string())?;
        let input_hex = result.get("input").and_then(|v| v.as_str()).unwrap_or("0x");
        let input = hex::decode(input_hex.trim_start_matches("0x")).map_err(|e| e.to_string())?;
        Ok(if contains_subsequence(&input, commitment) {
            CommitmentLocation::CanonicalSlot
        } else {
            CommitmentLocation::NotFound
        })
    }

    async fn block_time(&self, block_number: u64) -> CollabResult<u64> {
        let result = self
            .call("eth_getBlockByNumber", serde_json::json!([format!("0x{block_number:x}"), false]))
            .await
            .map_err(|e| e.to_string())?;
        let timestamp_hex = result.get("timestamp").and_then(|v| v.as_str()).unwrap_or("0x0");
        u64::from_str_radix(timestamp_hex.trim_start_matches("0x"), 16).map_err(|e| e.to_string())
    }
}

/// Owns every collaborator backend a whole-timestamp verification needs,
/// built once per invocation from [`Config`] and the enabled chain-backend
/// features, so a [`VerifyContext`] can borrow from it.
pub struct Collaborators {
    bitcoin: Option<Box<dyn ChainRpc + Send + Sync>>,
    litecoin: Option<Box<dyn ChainRpc + Send + Sync>>,
    ethereum: Option<Box<dyn EthereumRpc + Send + Sync>>,
    calendar: CalendarClient,
    cache: Box<dyn Cache + Send + Sync>,
}

impl Collaborators {
    /// Build every collaborator this build and `config` can support
    ///
    /// # Errors
    ///
    /// Returns an error if the calendar HTTP client or the file-backed
    /// cache can't be initialized.
    pub fn new(config: &Config) -> Result<Self> {
        #[cfg(feature = "electrum")]
        let bitcoin: Option<Box<dyn ChainRpc + Send + Sync>> = Some(Box::new(ElectrumChainRpc::new(None)));
        #[cfg(not(feature = "electrum"))]
        let bitcoin: Option<Box<dyn ChainRpc + Send + Sync>> = None;

        #[cfg(feature = "electrum")]
        let litecoin: Option<Box<dyn ChainRpc + Send + Sync>> = config
            .litecoin_electrum_server
            .clone()
            .map(|server| Box::new(ElectrumChainRpc::new(Some(server))) as _);
        #[cfg(not(feature = "electrum"))]
        let litecoin: Option<Box<dyn ChainRpc + Send + Sync>> = None;

        let ethereum: Option<Box<dyn EthereumRpc + Send + Sync>> =
            config.ethereum_rpc_url.clone().map(|url| Box::new(EthereumHttpRpc::new(url)) as _);

        let calendar = CalendarClient::new(std::time::Duration::from_secs(config.timeout_secs))?;

        let cache: Box<dyn Cache + Send + Sync> = match &config.cache_dir {
            Some(dir) => Box::new(FileCache::open(dir).map_err(|e| Error::Cache(e.to_string()))?),
            None => Box::new(MemoryCache::new()),
        };

        Ok(Self { bitcoin, litecoin, ethereum, calendar, cache })
    }

    /// Borrow every configured collaborator into a [`VerifyContext`]
    #[must_use]
    pub fn context(&self, min_score: f64) -> VerifyContext<'_> {
        VerifyContext {
            bitcoin: self.bitcoin.as_deref(),
            litecoin: self.litecoin.as_deref(),
            ethereum: self.ethereum.as_deref(),
            calendar: Some(&self.calendar as &(dyn Calendar + Sync)),
            cache: Some(self.cache.as_ref() as &(dyn Cache + Sync)),
            min_score,
        }
    }

    /// The calendar client, used directly by the stamp and upgrade commands
    #[must_use]
    pub fn calendar(&self) -> &CalendarClient {
        &self.calendar
    }

    /// The cache, used directly by the upgrade command's cooldown tracking
    #[must_use]
    pub fn cache(&self) -> &(dyn Cache + Sync) {
        self.cache.as_ref()
    }
}
