use crate::errors::GatewayError;
use crate::gateway::{LedgerBlock, LedgerGateway, LedgerReceipt, LedgerTransaction};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;

pub struct RpcClient {
    host: String,
    client: Client,
}

impl RpcClient {
    pub fn new(host: String) -> Self {
        RpcClient {
            host,
            client: Client::new(),
        }
    }

    /// Sends a request and returns its `result`, `None` when the node answered `null`.
    pub async fn request_optional<T>(&self, request: &Request) -> Result<Option<T>, GatewayError>
    where
        T: for<'de> Deserialize<'de> + Debug,
    {
        let response: Response<T> = self
            .client
            .post(&self.host)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(error.into());
        }

        Ok(response.result)
    }

    pub async fn request<T>(&self, request: &Request) -> Result<T, GatewayError>
    where
        T: for<'de> Deserialize<'de> + Debug,
    {
        self.request_optional(request).await?.ok_or_else(|| {
            GatewayError::invalid_response(format!("No result in {} response", request.method))
        })
    }

    pub fn create_request(&self, method: &str, params: Option<Value>) -> Request {
        Request {
            method: method.to_string(),
            params,
            id: json!(generate_rpc_id()),
            jsonrpc: Some("2.0".to_string()),
        }
    }
}

#[async_trait]
impl LedgerGateway for RpcClient {
    async fn get_latest_block_number(&self) -> Result<u64, GatewayError> {
        let value: String = self
            .request(&self.create_request("eth_blockNumber", None))
            .await?;

        parse_hex_to_u64(&value)
    }

    async fn get_block(&self, number: u64) -> Result<LedgerBlock, GatewayError> {
        let value: Option<Value> = self
            .request_optional(&self.create_request(
                "eth_getBlockByNumber",
                Some(json!([format!("0x{:x}", number), false])),
            ))
            .await?;

        let value = value.ok_or_else(|| GatewayError::not_found(format!("block {}", number)))?;
        parse_block(&value)
    }

    async fn get_transaction(&self, id: &str) -> Result<LedgerTransaction, GatewayError> {
        let value: Option<Value> = self
            .request_optional(&self.create_request("eth_getTransactionByHash", Some(json!([id]))))
            .await?;

        let value = value.ok_or_else(|| GatewayError::not_found(format!("transaction {}", id)))?;
        parse_transaction(&value)
    }

    async fn get_transaction_receipt(&self, id: &str) -> Result<LedgerReceipt, GatewayError> {
        let value: Option<Value> = self
            .request_optional(&self.create_request("eth_getTransactionReceipt", Some(json!([id]))))
            .await?;

        let value = value.ok_or_else(|| GatewayError::not_found(format!("receipt {}", id)))?;
        parse_receipt(&value)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The name of the RPC call.
    pub method: String,
    /// Parameters to the RPC call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Identifier for this request, which should appear in the response.
    pub id: Value,
    /// jsonrpc field, MUST be "2.0".
    pub jsonrpc: Option<String>,
}

/// A JSONRPC response object.
#[derive(Debug, Clone, Deserialize)]
pub struct Response<T> {
    /// A result if there is one, or [`None`].
    pub result: Option<T>,
    /// An error if there is one, or [`None`].
    pub error: Option<RpcError>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RpcError {
    /// The integer identifier of the error
    pub code: i32,
    /// A string describing the error
    pub message: String,
    /// Additional data specific to the error
    pub data: Option<Value>,
}

impl std::error::Error for RpcError {}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RPC Error {}: {} {}",
            self.code,
            self.message,
            self.data
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default()
        )
    }
}

fn generate_rpc_id() -> u32 {
    rand::rng().random()
}

pub fn get_rpc_client(rpc_url: Url) -> RpcClient {
    RpcClient::new(rpc_url.to_string())
}

fn parse_hex_to_u64(hex_str: &str) -> Result<u64, GatewayError> {
    let cleaned = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u64::from_str_radix(cleaned, 16)
        .map_err(|e| GatewayError::invalid_response(format!("{}: {}", hex_str, e)))
}

fn parse_hex_to_u128(hex_str: &str) -> Result<u128, GatewayError> {
    let cleaned = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u128::from_str_radix(cleaned, 16)
        .map_err(|e| GatewayError::invalid_response(format!("{}: {}", hex_str, e)))
}

fn hex_field<'a>(value: &'a Value, field: &str) -> Result<&'a str, GatewayError> {
    value[field]
        .as_str()
        .ok_or_else(|| GatewayError::invalid_response(format!("Missing or invalid {} field", field)))
}

pub fn parse_block(value: &Value) -> Result<LedgerBlock, GatewayError> {
    let number = parse_hex_to_u64(hex_field(value, "number")?)?;

    // Requested with full transactions disabled, so entries are hashes
    let transaction_ids = value["transactions"]
        .as_array()
        .ok_or_else(|| GatewayError::invalid_response("Missing or invalid transactions array"))?
        .iter()
        .map(|tx| match tx {
            Value::String(hash) => Ok(hash.clone()),
            Value::Object(_) => tx["hash"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| GatewayError::invalid_response("Missing transaction hash")),
            _ => Err(GatewayError::invalid_response("Invalid transaction entry")),
        })
        .collect::<Result<Vec<String>, GatewayError>>()?;

    Ok(LedgerBlock {
        number,
        transaction_ids,
    })
}

pub fn parse_transaction(value: &Value) -> Result<LedgerTransaction, GatewayError> {
    let hash = hex_field(value, "hash")?.to_string();
    let gas_price_wei = parse_hex_to_u128(hex_field(value, "gasPrice")?)?;

    Ok(LedgerTransaction {
        hash,
        gas_price_wei,
    })
}

pub fn parse_receipt(value: &Value) -> Result<LedgerReceipt, GatewayError> {
    let hash = hex_field(value, "transactionHash")?.to_string();
    let gas_used = parse_hex_to_u64(hex_field(value, "gasUsed")?)?;

    Ok(LedgerReceipt { hash, gas_used })
}
