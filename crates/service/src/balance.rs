use crate::service::TransactionService;
use chrono::Utc;
use tracing::{instrument, warn};
use txidx_errors::CoreError;
use txidx_types::{normalize_address, Balance, BalanceResponse, BalanceSource};

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

impl TransactionService {
    /// `get_balance`: KV, then a live upstream refresh (balance and chain
    /// height together), persisting the refreshed snapshot to the durable
    /// store and the cache. If the upstream call fails, the last durable
    /// snapshot is served instead, if one exists.
    #[instrument(skip(self))]
    pub async fn get_balance(&self, address: &str) -> Result<BalanceResponse, CoreError> {
        let normalized = normalize_address(address)?;
        let address = normalized.lowercase();

        if let Some(balance) = self.cache.get_balance(&address).await {
            let cache_age_secs = (Utc::now() - balance.updated_at).num_seconds();
            return to_response(&address, &balance, true, Some(cache_age_secs), BalanceSource::Cache);
        }

        match self.refresh_balance(&address).await {
            Ok(balance) => {
                let (store_result, ()) =
                    tokio::join!(self.store.upsert_balance(&address, &balance), self.cache.set_balance(&address, &balance));
                if let Err(e) = store_result {
                    warn!(address, %e, "failed to persist the refreshed balance snapshot");
                }
                to_response(&address, &balance, false, None, BalanceSource::Provider)
            }
            Err(e) => {
                warn!(address, %e, "upstream balance refresh failed, falling back to the last durable snapshot");
                match self.store.get_balance(&address).await {
                    Ok(Some(balance)) => to_response(&address, &balance, false, None, BalanceSource::Database),
                    Ok(None) => Err(e),
                    Err(store_err) => {
                        warn!(address, %store_err, "durable snapshot lookup also failed");
                        Err(e)
                    }
                }
            }
        }
    }

    async fn refresh_balance(&self, address: &str) -> Result<Balance, CoreError> {
        let (balance_wei, block_number) =
            tokio::try_join!(self.node.get_balance(address), self.node.get_block_number())?;
        Ok(Balance { balance: balance_wei, block_number, updated_at: Utc::now() })
    }
}

fn to_response(
    address: &str,
    balance: &Balance,
    from_cache: bool,
    cache_age_secs: Option<i64>,
    source: BalanceSource,
) -> Result<BalanceResponse, CoreError> {
    Ok(BalanceResponse {
        address: address.to_string(),
        balance: wei_to_ether(&balance.balance)?,
        balance_wei: balance.balance.clone(),
        block_number: balance.block_number,
        last_updated: balance.updated_at,
        from_cache,
        cache_age_secs,
        source,
    })
}

/// Render a decimal wei amount as a decimal ether amount, without floating
/// point. Trailing fractional zeros are trimmed; a whole-ether balance has
/// no decimal point at all.
fn wei_to_ether(wei: &str) -> Result<String, CoreError> {
    let value: u128 =
        wei.parse().map_err(|e| CoreError::Internal(format!("stored balance {wei:?} was not a valid integer: {e}")))?;
    let integer = value / WEI_PER_ETHER;
    let fraction = value % WEI_PER_ETHER;
    if fraction == 0 {
        return Ok(integer.to_string());
    }
    let frac_str = format!("{fraction:018}");
    let trimmed = frac_str.trim_end_matches('0');
    Ok(format!("{integer}.{trimmed}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, ServiceHarness};

    #[test]
    fn wei_to_ether_trims_trailing_zeros() {
        assert_eq!(wei_to_ether("1000000000000000000").unwrap(), "1");
        assert_eq!(wei_to_ether("1500000000000000000").unwrap(), "1.5");
        assert_eq!(wei_to_ether("0").unwrap(), "0");
    }

    #[test]
    fn wei_to_ether_handles_sub_ether_amounts() {
        assert_eq!(wei_to_ether("1").unwrap(), "0.000000000000000001");
    }

    #[tokio::test]
    async fn first_call_refreshes_from_upstream_and_persists() {
        let ServiceHarness { service, store, .. } = harness().await;
        let address = "11".repeat(20);

        let response = service.get_balance(&address).await.unwrap();
        assert_eq!(response.source, BalanceSource::Provider);
        assert!(!response.from_cache);
        assert!(store.get_balance(&address).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let ServiceHarness { service, .. } = harness().await;
        let address = "22".repeat(20);

        service.get_balance(&address).await.unwrap();
        let second = service.get_balance(&address).await.unwrap();
        assert_eq!(second.source, BalanceSource::Cache);
        assert!(second.from_cache);
    }
}
