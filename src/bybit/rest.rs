use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use sha2::Sha256;

use crate::config::BybitConfig;
use crate::error::AppError;
use crate::gateway::{
    ApiAck, BalanceRecord, ExchangeGateway, OrderRecord, PositionRaw,
};
use crate::model::order::OrderRequest;

use super::types::{
    ApiResponse, OrderListResult, PositionListResult, TickerResult, WalletBalanceResult,
};

const CATEGORY_LINEAR: &str = "linear";
const SETTLE_COIN: &str = "USDT";

pub struct BybitRestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    recv_window: u64,
}

impl BybitRestClient {
    pub fn new(config: &BybitConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            http,
            base_url: config.rest_base_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            recv_window: config.recv_window,
        })
    }

    /// Bybit v5 signature: HMAC-SHA256 over timestamp + key + recvWindow +
    /// (query string for GET, raw JSON body for POST).
    fn sign(&self, timestamp: i64, payload: &str) -> String {
        let message = format!(
            "{}{}{}{}",
            timestamp, self.api_key, self.recv_window, payload
        );
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC key error");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn auth_headers(
        &self,
        req: reqwest::RequestBuilder,
        timestamp: i64,
        signature: &str,
    ) -> reqwest::RequestBuilder {
        req.header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-SIGN-TYPE", "2")
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", self.recv_window.to_string())
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<ApiResponse<T>, AppError> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let signature = self.sign(timestamp, query);
        let url = format!("{}{}?{}", self.base_url, path, query);
        let resp = self
            .auth_headers(self.http.get(&url), timestamp, &signature)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<ApiResponse<T>>().await?)
    }

    async fn signed_post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiAck, AppError> {
        let payload = serde_json::to_string(body)?;
        let timestamp = chrono::Utc::now().timestamp_millis();
        let signature = self.sign(timestamp, &payload);
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .auth_headers(self.http.post(&url), timestamp, &signature)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await?
            .error_for_status()?;
        let envelope: ApiResponse<serde_json::Value> = resp.json().await?;
        // Non-zero retCode is an application-level outcome, not a transport
        // failure; the caller decides how to surface it.
        Ok(ApiAck {
            code: envelope.ret_code,
            message: envelope.ret_msg,
        })
    }

    fn unwrap_result<T>(envelope: ApiResponse<T>) -> Result<T, AppError> {
        if envelope.ret_code != 0 {
            return Err(AppError::BybitApi {
                code: envelope.ret_code,
                msg: envelope.ret_msg,
            });
        }
        envelope
            .result
            .ok_or_else(|| AppError::InvalidRecord("response missing result".to_string()))
    }
}

#[async_trait]
impl ExchangeGateway for BybitRestClient {
    async fn get_wallet_balance(&self) -> Result<Vec<BalanceRecord>, AppError> {
        let envelope: ApiResponse<WalletBalanceResult> = self
            .signed_get("/v5/account/wallet-balance", "accountType=UNIFIED")
            .await?;
        let result = Self::unwrap_result(envelope)?;
        let records = result
            .list
            .into_iter()
            .flat_map(|account| account.coin)
            .map(|coin| BalanceRecord {
                asset: coin.coin,
                wallet_balance: coin.wallet_balance,
                available_to_withdraw: coin.available_to_withdraw,
            })
            .collect();
        Ok(records)
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Decimal, AppError> {
        // Market data is public; no signature required.
        let url = format!(
            "{}/v5/market/tickers?category=spot&symbol={}",
            self.base_url, symbol
        );
        let envelope: ApiResponse<TickerResult> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let result = Self::unwrap_result(envelope)?;
        result
            .list
            .first()
            .map(|t| t.last_price)
            .ok_or_else(|| AppError::InvalidRecord(format!("no ticker for {symbol}")))
    }

    async fn get_positions(&self) -> Result<Vec<PositionRaw>, AppError> {
        let query = format!("category={CATEGORY_LINEAR}&settleCoin={SETTLE_COIN}");
        let envelope: ApiResponse<PositionListResult> =
            self.signed_get("/v5/position/list", &query).await?;
        let result = Self::unwrap_result(envelope)?;
        let raw = result
            .list
            .into_iter()
            .map(|item| PositionRaw {
                symbol: item.symbol,
                side: item.side,
                size: item.size,
                entry_price: item.avg_price,
                mark_price: item.mark_price,
                unrealized_pnl: item.unrealised_pnl,
                margin: item.position_im,
                leverage: item.leverage,
            })
            .collect();
        Ok(raw)
    }

    async fn get_open_orders(&self) -> Result<Vec<OrderRecord>, AppError> {
        let query = format!("category={CATEGORY_LINEAR}&settleCoin={SETTLE_COIN}");
        let envelope: ApiResponse<OrderListResult> =
            self.signed_get("/v5/order/realtime", &query).await?;
        let result = Self::unwrap_result(envelope)?;
        let orders = result
            .list
            .into_iter()
            .map(|item| OrderRecord {
                symbol: item.symbol,
                order_id: item.order_id,
                side: item.side,
                price: item.price,
                qty: item.qty,
                order_type: item.order_type,
                status: item.order_status,
            })
            .collect();
        Ok(orders)
    }

    async fn place_order(&self, req: &OrderRequest) -> Result<ApiAck, AppError> {
        let mut body = json!({
            "category": CATEGORY_LINEAR,
            "symbol": req.symbol,
            "side": req.side.as_bybit_str(),
            "orderType": req.order_type.as_bybit_str(),
            "qty": req.qty.to_string(),
        });
        if let Some(price) = req.price {
            body["price"] = json!(price.to_string());
        }
        tracing::info!(
            symbol = %req.symbol,
            side = %req.side,
            order_type = %req.order_type,
            qty = %req.qty,
            "Placing order"
        );
        self.signed_post("/v5/order/create", &body).await
    }

    async fn cancel_all_orders(&self) -> Result<ApiAck, AppError> {
        let body = json!({
            "category": CATEGORY_LINEAR,
            "settleCoin": SETTLE_COIN,
        });
        tracing::info!("Cancelling all open orders");
        self.signed_post("/v5/order/cancel-all", &body).await
    }

    async fn set_leverage(
        &self,
        symbol: &str,
        buy_leverage: u32,
        sell_leverage: u32,
    ) -> Result<ApiAck, AppError> {
        let body = json!({
            "category": CATEGORY_LINEAR,
            "symbol": symbol,
            "buyLeverage": buy_leverage.to_string(),
            "sellLeverage": sell_leverage.to_string(),
        });
        tracing::info!(symbol, buy_leverage, sell_leverage, "Setting leverage");
        self.signed_post("/v5/position/set-leverage", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> BybitRestClient {
        let config = BybitConfig {
            rest_base_url: "https://api-testnet.bybit.com".to_string(),
            symbols: vec![],
            recv_window: 5000,
            request_timeout_secs: 10,
            api_key: "test_key".to_string(),
            api_secret: "test_secret".to_string(),
        };
        BybitRestClient::new(&config).unwrap()
    }

    #[test]
    fn signature_is_sha256_hex() {
        let client = test_client();
        let sig = client.sign(1_700_000_000_000, "accountType=UNIFIED");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_covers_timestamp_key_window_and_payload() {
        let client = test_client();
        let base = client.sign(1_700_000_000_000, "a=1");
        // Any component change must change the signature.
        assert_ne!(base, client.sign(1_700_000_000_001, "a=1"));
        assert_ne!(base, client.sign(1_700_000_000_000, "a=2"));
    }

    #[test]
    fn signature_matches_manual_hmac() {
        let client = test_client();
        let timestamp = 1_700_000_000_000i64;
        let payload = r#"{"category":"linear"}"#;

        let message = format!("{}test_key{}{}", timestamp, 5000, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(b"test_secret").unwrap();
        mac.update(message.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(client.sign(timestamp, payload), expected);
    }
}
