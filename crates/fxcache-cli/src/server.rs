//! JSON-RPC 2.0 server mode for fxcache
//!
//! Lets a UI process use fxcache as its currency backend. Reads one JSON-RPC
//! request per line from stdin and writes one response per line to stdout.

use fxcache_core::{Currency, CurrencyContext, RateOutcome};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use tokio::runtime::Runtime;

/// JSON-RPC 2.0 request
#[derive(Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<serde_json::Value>,
    id: serde_json::Value,
}

/// JSON-RPC 2.0 response
#[derive(Serialize)]
struct Response {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: serde_json::Value,
}

/// JSON-RPC error object
#[derive(Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Rates as returned by getExchangeRates / refreshExchangeRates
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RatesResult {
    base_currency: Currency,
    source: fxcache_core::RateSource,
    last_updated: Option<u64>,
    stale: bool,
    rates: BTreeMap<Currency, f64>,
}

#[derive(Serialize)]
struct ConvertResult {
    amount: f64,
    display: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrencyResult {
    code: String,
    name: String,
    symbol: String,
    flag: String,
}

/// Params for getExchangeRates / refreshExchangeRates
#[derive(Deserialize, Default)]
struct RatesParams {
    #[serde(default)]
    base: Option<String>,
}

/// Params for convertCurrency
#[derive(Deserialize)]
struct ConvertParams {
    amount: f64,
    from: String,
    to: String,
}

/// Params for formatCurrency
#[derive(Deserialize)]
struct FormatParams {
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
}

/// Params for the code lookups, isSupportedCurrency and selectCurrency
#[derive(Deserialize)]
struct CodeParams {
    code: String,
}

// JSON-RPC error codes
const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

impl Response {
    fn success(id: serde_json::Value, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self {
                jsonrpc: "2.0",
                result: Some(result),
                error: None,
                id,
            },
            Err(e) => Self::error(id, INTERNAL_ERROR, format!("Serialization failed: {e}")),
        }
    }

    fn error(id: serde_json::Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

/// Deserialize required params
fn params<T: DeserializeOwned>(
    id: &serde_json::Value,
    params: Option<serde_json::Value>,
) -> Result<T, Response> {
    match params {
        Some(p) => serde_json::from_value(p).map_err(|e| {
            Response::error(id.clone(), INVALID_PARAMS, format!("Invalid params: {e}"))
        }),
        None => Err(Response::error(id.clone(), INVALID_PARAMS, "Missing params")),
    }
}

fn rates_result(ctx: &CurrencyContext, outcome: RateOutcome) -> RatesResult {
    RatesResult {
        base_currency: outcome.snapshot.base_currency,
        source: outcome.source,
        last_updated: outcome.snapshot.fetched_at,
        stale: ctx.rates_stale(),
        rates: outcome.snapshot.rates.clone(),
    }
}

fn currency_result(ctx: &CurrencyContext, code: &str) -> CurrencyResult {
    let meta = ctx.currency_info(code);
    CurrencyResult {
        code: meta.code.into_owned(),
        name: meta.display_name.into_owned(),
        symbol: meta.symbol.into_owned(),
        flag: meta.flag.into_owned(),
    }
}

/// Handle a single JSON-RPC request
fn handle_request(ctx: &mut CurrencyContext, rt: &Runtime, input: &str) -> Response {
    // Parse request
    let request: Request = match serde_json::from_str(input) {
        Ok(r) => r,
        Err(e) => {
            return Response::error(
                serde_json::Value::Null,
                PARSE_ERROR,
                format!("Parse error: {e}"),
            );
        }
    };

    // Validate jsonrpc version
    if request.jsonrpc != "2.0" {
        return Response::error(request.id, INVALID_REQUEST, "Invalid JSON-RPC version");
    }

    let id = request.id;
    let result = match request.method.as_str() {
        "getExchangeRates" => handle_rates(ctx, rt, &id, request.params, false),
        "refreshExchangeRates" => handle_rates(ctx, rt, &id, request.params, true),
        "convertCurrency" => handle_convert(ctx, rt, &id, request.params),
        "formatCurrency" => handle_format(ctx, &id, request.params),
        "getCurrencySymbol" => params::<CodeParams>(&id, request.params)
            .map(|p| Response::success(id.clone(), ctx.currency_symbol(&p.code))),
        "getCurrencyName" => params::<CodeParams>(&id, request.params)
            .map(|p| Response::success(id.clone(), ctx.currency_name(&p.code))),
        "getCurrencyFlag" => params::<CodeParams>(&id, request.params)
            .map(|p| Response::success(id.clone(), ctx.currency_flag(&p.code))),
        "isSupportedCurrency" => params::<CodeParams>(&id, request.params)
            .map(|p| Response::success(id.clone(), ctx.is_supported_currency(&p.code))),
        "selectCurrency" => handle_select(ctx, &id, request.params),
        "selectedCurrency" => {
            let code = ctx.selected_currency().code();
            Ok(Response::success(id.clone(), currency_result(ctx, code)))
        }
        "ratesStatus" => Ok(Response::success(id.clone(), ctx.status())),
        _ => Err(Response::error(
            id.clone(),
            METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        )),
    };

    result.unwrap_or_else(|response| response)
}

/// Handle getExchangeRates / refreshExchangeRates
fn handle_rates(
    ctx: &CurrencyContext,
    rt: &Runtime,
    id: &serde_json::Value,
    params: Option<serde_json::Value>,
    refresh: bool,
) -> Result<Response, Response> {
    let params: RatesParams = match params {
        Some(_) => self::params(id, params)?,
        None => RatesParams::default(),
    };
    let base = match params.base.as_deref() {
        Some(code) => code
            .parse::<Currency>()
            .map_err(|e| Response::error(id.clone(), INVALID_PARAMS, e.to_string()))?,
        None => Currency::USD,
    };

    let outcome = if refresh {
        rt.block_on(ctx.refresh_exchange_rates(base))
    } else {
        rt.block_on(ctx.get_exchange_rates(base))
    };
    Ok(Response::success(id.clone(), rates_result(ctx, outcome)))
}

/// Handle convertCurrency - never fails once params are valid
fn handle_convert(
    ctx: &CurrencyContext,
    rt: &Runtime,
    id: &serde_json::Value,
    params: Option<serde_json::Value>,
) -> Result<Response, Response> {
    let p: ConvertParams = self::params(id, params)?;
    let amount = rt.block_on(ctx.convert_currency(p.amount, &p.from, &p.to));
    let result = ConvertResult {
        amount,
        display: ctx.format_currency(Some(amount), &p.to),
    };
    Ok(Response::success(id.clone(), result))
}

/// Handle formatCurrency - currency defaults to the selected one
fn handle_format(
    ctx: &CurrencyContext,
    id: &serde_json::Value,
    params: Option<serde_json::Value>,
) -> Result<Response, Response> {
    let p: FormatParams = self::params(id, params)?;
    let display = match p.currency.as_deref() {
        Some(code) => ctx.format_currency(p.amount, code),
        None => ctx.format_selected(p.amount),
    };
    Ok(Response::success(id.clone(), display))
}

/// Handle selectCurrency - unsupported codes leave the selection unchanged
fn handle_select(
    ctx: &mut CurrencyContext,
    id: &serde_json::Value,
    params: Option<serde_json::Value>,
) -> Result<Response, Response> {
    let p: CodeParams = self::params(id, params)?;
    let currency = ctx
        .select_currency(&p.code)
        .map_err(|e| Response::error(id.clone(), INVALID_PARAMS, e.to_string()))?;
    Ok(Response::success(id.clone(), currency_result(ctx, currency.code())))
}

/// Run the JSON-RPC server loop
pub fn run_server(ctx: &mut CurrencyContext, rt: &Runtime) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_request(ctx, rt, &line);
        let json = serde_json::to_string(&response)?;
        writeln!(stdout, "{json}")?;
        stdout.flush()?;
    }

    Ok(())
}
