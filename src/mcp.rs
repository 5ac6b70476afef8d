//! img2stitch MCP (Model Context Protocol) server
//!
//! Standalone stdio server exposing pattern conversion, brand conversion and
//! catalog listing to AI assistants. Logs go to stderr; stdout carries only
//! JSON-RPC responses.

use img2stitch::{convert_thread_brand, load_image, Brand, PatternBuilder, PatternConfig, ThreadCatalog};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// MCP Request structure
#[derive(Debug, Deserialize)]
struct McpRequest {
    #[serde(default)]
    #[allow(dead_code)]
    jsonrpc: String,
    #[serde(flatten)]
    kind: RequestKind,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "method")]
enum RequestKind {
    #[serde(rename = "initialize")]
    Initialize {
        id: Value,
        #[serde(default)]
        params: Value,
    },
    #[serde(rename = "tools/list")]
    ToolsList { id: Value },
    #[serde(rename = "tools/call")]
    ToolsCall { id: Value, params: ToolCallParams },
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ConvertImageArgs {
    input_path: String,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(flatten)]
    config: PatternConfig,
}

#[derive(Debug, Deserialize)]
struct ConvertThreadArgs {
    code: String,
    #[serde(default = "default_from_brand")]
    from_brand: String,
    to_brand: String,
}

fn default_from_brand() -> String {
    Brand::Dmc.to_string()
}

#[derive(Debug, Default, Deserialize)]
struct ListThreadsArgs {
    #[serde(default)]
    brand: Option<String>,
}

/// MCP Response structure
#[derive(Debug, serde::Serialize)]
struct McpResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, serde::Serialize)]
struct McpError {
    code: i32,
    message: String,
}

const INVALID_PARAMS: i32 = -32602;
const METHOD_NOT_FOUND: i32 = -32601;
const TOOL_FAILED: i32 = -32000;

impl McpResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn text(id: Value, text: String) -> Self {
        Self::ok(id, json!({ "content": [{ "type": "text", "text": text }] }))
    }

    fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError { code, message }),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, String> {
    serde_json::from_value(arguments).map_err(|e| format!("Invalid arguments: {}", e))
}

struct Img2StitchMcpServer {
    catalog: ThreadCatalog,
}

impl Img2StitchMcpServer {
    fn handle_initialize(&self, _params: Value, id: Value) -> McpResponse {
        McpResponse::ok(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {
                    "name": "img2stitch",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    }
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> McpResponse {
        let brands: Vec<&str> = Brand::ALL.iter().map(|b| b.as_str()).collect();
        McpResponse::ok(
            id,
            json!({
                "tools": [
                    {
                        "name": "convert_image_to_pattern",
                        "description": "Convert a raster image (PNG, JPEG, etc.) into a cross-stitch or outline pattern. Colors are quantized with k-means in CIELAB and matched to real embroidery threads. Returns the pattern JSON: stitch grid, symbol-keyed thread palette, physical dimensions and estimated stitching time.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "input_path": {
                                    "type": "string",
                                    "description": "Path to the input image file"
                                },
                                "output_path": {
                                    "type": "string",
                                    "description": "Optional path where the pattern JSON is also written"
                                },
                                "pattern_type": {
                                    "type": "string",
                                    "enum": ["cross_stitch", "outline"],
                                    "default": "cross_stitch"
                                },
                                "thread_brand": {
                                    "type": "string",
                                    "enum": brands,
                                    "default": "DMC"
                                },
                                "max_colors": {
                                    "type": "integer",
                                    "description": "Maximum palette size (default: 16)",
                                    "minimum": 1,
                                    "default": 16
                                },
                                "aida_count": {
                                    "type": "integer",
                                    "enum": [14, 16, 18, 20],
                                    "default": 14
                                },
                                "enable_dithering": { "type": "boolean", "default": false },
                                "enhance_contrast": {
                                    "type": "boolean",
                                    "description": "Equalize lightness (CLAHE) before quantizing",
                                    "default": false
                                },
                                "edge_blur_sigma": {
                                    "type": "number",
                                    "description": "Blur before outline edge detection; 0 disables",
                                    "default": 1.0
                                },
                                "use_inventory": { "type": "boolean", "default": false },
                                "inventory_ids": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "description": "Owned thread ids such as dmc_310"
                                },
                                "max_width": { "type": "integer", "default": 150 },
                                "max_height": { "type": "integer", "default": 150 },
                                "target_width_cm": { "type": "number" },
                                "seed": { "type": "integer", "description": "Seed for reproducible palettes" }
                            },
                            "required": ["input_path"]
                        }
                    },
                    {
                        "name": "convert_thread_brand",
                        "description": "Find the closest thread in another brand for a given thread code.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "code": { "type": "string", "description": "Color code, e.g. 310" },
                                "from_brand": { "type": "string", "enum": brands, "default": "DMC" },
                                "to_brand": { "type": "string", "enum": brands }
                            },
                            "required": ["code", "to_brand"]
                        }
                    },
                    {
                        "name": "list_threads",
                        "description": "List catalog threads, optionally for one brand.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "brand": { "type": "string", "enum": brands }
                            }
                        }
                    }
                ]
            }),
        )
    }

    fn handle_tools_call(&self, params: ToolCallParams, id: Value) -> McpResponse {
        if !params.arguments.is_object() && !params.arguments.is_null() {
            return McpResponse::error(id, INVALID_PARAMS, "Invalid arguments: expected object".to_string());
        }
        let result = match params.name.as_str() {
            "convert_image_to_pattern" => self.convert_image(params.arguments),
            "convert_thread_brand" => self.convert_thread(params.arguments),
            "list_threads" => self.list_threads(params.arguments),
            _ => {
                return McpResponse::error(id, METHOD_NOT_FOUND, format!("Unknown tool: {}", params.name));
            }
        };
        match result {
            Ok(text) => McpResponse::text(id, text),
            Err((code, message)) => {
                log::warn!("Tool {} failed: {}", params.name, message);
                McpResponse::error(id, code, message)
            }
        }
    }

    fn convert_image(&self, arguments: Value) -> Result<String, (i32, String)> {
        let args: ConvertImageArgs = parse_args(arguments).map_err(|e| (INVALID_PARAMS, e))?;
        let image = load_image(Path::new(&args.input_path))
            .map_err(|e| (TOOL_FAILED, format!("Conversion failed: {}", e)))?;
        let artifact = PatternBuilder::new(&self.catalog)
            .build(&image, &args.config)
            .map_err(|e| (TOOL_FAILED, format!("Conversion failed: {}", e)))?;
        let json = artifact
            .to_json()
            .map_err(|e| (TOOL_FAILED, format!("Serialization failed: {}", e)))?;
        if let Some(output) = &args.output_path {
            std::fs::write(output, &json).map_err(|e| (TOOL_FAILED, format!("Failed to write {}: {}", output, e)))?;
        }
        Ok(json)
    }

    fn convert_thread(&self, arguments: Value) -> Result<String, (i32, String)> {
        let args: ConvertThreadArgs = parse_args(arguments).map_err(|e| (INVALID_PARAMS, e))?;
        let from: Brand = args.from_brand.parse().map_err(|e| (INVALID_PARAMS, format!("{}", e)))?;
        let to: Brand = args.to_brand.parse().map_err(|e| (INVALID_PARAMS, format!("{}", e)))?;
        let m = convert_thread_brand(&self.catalog, &args.code, from, to)
            .map_err(|e| (TOOL_FAILED, e.to_string()))?;
        let result = json!({
            "thread_id": m.thread.thread_id,
            "brand": m.thread.brand,
            "color_code": m.thread.color_code,
            "color_name": m.thread.color_name,
            "rgb": [m.thread.rgb.r, m.thread.rgb.g, m.thread.rgb.b],
            "delta_e": (m.delta_e * 100.0).round() / 100.0,
            "quality": m.quality,
        });
        Ok(result.to_string())
    }

    fn list_threads(&self, arguments: Value) -> Result<String, (i32, String)> {
        let args: ListThreadsArgs = if arguments.is_null() {
            ListThreadsArgs::default()
        } else {
            parse_args(arguments).map_err(|e| (INVALID_PARAMS, e))?
        };
        let threads = match args.brand {
            Some(name) => {
                let brand: Brand = name.parse().map_err(|e| (INVALID_PARAMS, format!("{}", e)))?;
                self.catalog.by_brand(brand)
            }
            None => self.catalog.all().iter().collect(),
        };
        serde_json::to_string(&threads).map_err(|e| (TOOL_FAILED, e.to_string()))
    }

    fn run(&self) {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut stdout_lock = stdout.lock();

        for line in stdin.lock().lines().map_while(Result::ok) {
            if line.trim().is_empty() {
                continue;
            }
            let req = match serde_json::from_str::<McpRequest>(&line) {
                Ok(req) => req,
                Err(e) => {
                    log::debug!("Ignoring message: {}", e);
                    continue;
                }
            };
            let response = match req.kind {
                RequestKind::Initialize { id, params } => self.handle_initialize(params, id),
                RequestKind::ToolsList { id } => self.handle_tools_list(id),
                RequestKind::ToolsCall { id, params } => self.handle_tools_call(params, id),
            };

            if let Ok(response_json) = serde_json::to_string(&response) {
                writeln!(stdout_lock, "{}", response_json).ok();
                stdout_lock.flush().ok();
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let catalog = match std::env::var_os("IMG2STITCH_CATALOG") {
        Some(path) => ThreadCatalog::load(Path::new(&path))?,
        None => ThreadCatalog::builtin()?,
    };
    log::info!("img2stitch MCP server ready with {} threads", catalog.len());

    let server = Img2StitchMcpServer { catalog };
    server.run();
    Ok(())
}
