use rust_decimal::Decimal;
use serde::Deserialize;

/// Deserialize Bybit string-encoded numbers to Decimal.
pub fn string_to_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<Decimal>().map_err(serde::de::Error::custom)
}

/// Same, but an empty string (Bybit's "not applicable") becomes zero.
pub fn string_to_decimal_lenient<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    s.parse::<Decimal>().map_err(serde::de::Error::custom)
}

/// Bybit v5 response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ret_code: i64,
    pub ret_msg: String,
    pub result: Option<T>,
}

/// GET /v5/account/wallet-balance result.
#[derive(Debug, Deserialize)]
pub struct WalletBalanceResult {
    pub list: Vec<WalletAccount>,
}

#[derive(Debug, Deserialize)]
pub struct WalletAccount {
    pub coin: Vec<CoinBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinBalance {
    pub coin: String,
    #[serde(deserialize_with = "string_to_decimal_lenient")]
    pub wallet_balance: Decimal,
    #[serde(default, deserialize_with = "string_to_decimal_lenient")]
    pub available_to_withdraw: Decimal,
}

/// GET /v5/market/tickers result.
#[derive(Debug, Deserialize)]
pub struct TickerResult {
    pub list: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    #[serde(deserialize_with = "string_to_decimal")]
    pub last_price: Decimal,
}

/// GET /v5/position/list result. Numerics stay as strings here; parsing
/// into validated records happens above the wire layer so one malformed
/// position cannot fail the whole response.
#[derive(Debug, Deserialize)]
pub struct PositionListResult {
    pub list: Vec<PositionItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionItem {
    pub symbol: String,
    pub side: String,
    pub size: String,
    #[serde(default)]
    pub avg_price: String,
    #[serde(default)]
    pub mark_price: String,
    #[serde(default)]
    pub unrealised_pnl: String,
    #[serde(default, rename = "positionIM")]
    pub position_im: String,
    #[serde(default)]
    pub leverage: String,
}

/// GET /v5/order/realtime result.
#[derive(Debug, Deserialize)]
pub struct OrderListResult {
    pub list: Vec<OrderItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub symbol: String,
    pub order_id: String,
    pub side: String,
    #[serde(default)]
    pub price: String,
    pub qty: String,
    pub order_type: String,
    pub order_status: String,
}
