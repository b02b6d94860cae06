use serde::Deserialize;

/// The explorer's `txlist` envelope. `result` is polymorphic: an array of
/// [`ExplorerTxRecord`] on success, or an error string ("No transactions
/// found", "Result window is too large...") when `status != "1"`. This crate
/// parses strictly into this fixed shape at the boundary; nothing downstream
/// ever sees an unparsed payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ExplorerEnvelope {
    pub(crate) status: String,
    pub(crate) message: String,
    pub(crate) result: serde_json::Value,
}

/// One row of the explorer's `txlist` response, in its native string-typed
/// wire shape. Converted to [`txidx_types::Transaction`] by the adapter,
/// which is also where the `timeStamp`/`isError`/`txreceipt_status`/`input`
/// mapping rules from the external-interfaces contract are applied.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExplorerTxRecord {
    pub(crate) hash: String,
    pub(crate) block_number: String,
    pub(crate) from: String,
    #[serde(default)]
    pub(crate) to: String,
    pub(crate) value: String,
    pub(crate) gas_price: String,
    #[serde(default)]
    pub(crate) gas_used: String,
    #[serde(default)]
    pub(crate) gas: String,
    #[serde(default)]
    pub(crate) input: String,
    #[serde(default)]
    pub(crate) function_name: String,
    #[serde(default)]
    pub(crate) is_error: String,
    #[serde(default)]
    pub(crate) txreceipt_status: String,
    #[serde(default)]
    pub(crate) contract_address: String,
    pub(crate) time_stamp: String,
}

/// A JSON-RPC 2.0 request, as sent to the node.
#[derive(Debug, serde::Serialize)]
pub(crate) struct JsonRpcRequest<'a> {
    pub(crate) jsonrpc: &'static str,
    pub(crate) id: u64,
    pub(crate) method: &'a str,
    pub(crate) params: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse {
    pub(crate) result: Option<serde_json::Value>,
    pub(crate) error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcError {
    pub(crate) code: i64,
    pub(crate) message: String,
}
