use anchor_lang::prelude::Pubkey;
use governance_power::{AccountSource, FetchError, RawAccount};
use log::debug;
use solana_account_decoder::UiAccountEncoding;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::RpcFilterType;
use std::time::Duration;

/// Reads program accounts from a JSON RPC node with `getProgramAccounts`.
pub struct RpcAccountSource {
    client: RpcClient,
    timeout: Duration,
}

impl RpcAccountSource {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: RpcClient::new_with_timeout(url.to_string(), timeout),
            timeout,
        }
    }

    fn map_error(&self, err: ClientError) -> FetchError {
        match err.kind() {
            ClientErrorKind::Reqwest(e) if e.is_timeout() => FetchError::Timeout(self.timeout),
            ClientErrorKind::Reqwest(e) if e.status().map(|s| s.as_u16()) == Some(429) => {
                FetchError::RateLimited
            }
            ClientErrorKind::SerdeJson(e) => FetchError::InvalidData(e.to_string()),
            _ => FetchError::Unavailable(err.to_string()),
        }
    }
}

impl AccountSource for RpcAccountSource {
    fn fetch_program_accounts(
        &self,
        program_id: &Pubkey,
        size_filter: Option<u64>,
    ) -> Result<Vec<RawAccount>, FetchError> {
        let config = RpcProgramAccountsConfig {
            filters: size_filter.map(|size| vec![RpcFilterType::DataSize(size)]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..RpcAccountInfoConfig::default()
            },
            with_context: Some(false),
        };
        debug!("getProgramAccounts {} size {:?}", program_id, size_filter);

        let accounts = self
            .client
            .get_program_accounts_with_config(program_id, config)
            .map_err(|e| self.map_error(e))?;
        Ok(accounts
            .into_iter()
            .map(|(address, account)| RawAccount {
                address,
                data: account.data,
            })
            .collect())
    }
}
