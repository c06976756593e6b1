/* src/mcp_server.rs */

use crate::prompts;
use crate::tools::{Registry, ToolOutcome};
use axum::Router;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use fancy_log::{LogLevel, log};
use parking_lot::Mutex;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
    Implementation, JsonObject, ListPromptsResult, ListToolsResult, PaginatedRequestParam, Prompt,
    PromptArgument, PromptMessage, PromptMessageRole, ProtocolVersion, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::transport::streamable_http_server::session::SessionManager;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

pub const MCP_PATH: &str = "/mcp";
pub const SESSION_HEADER: &str = "mcp-session-id";
pub const SERVER_NAME: &str = "pihole-mcp";

pub const MAX_SESSIONS: usize = 256;
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// MCP face of the tool registry and the prompt catalog.
#[derive(Clone)]
pub struct PiHoleMcp {
    registry: Arc<Registry>,
}

impl PiHoleMcp {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    fn tools(&self) -> Vec<Tool> {
        self.registry
            .definitions()
            .iter()
            .map(|def| {
                let schema = match &def.input_schema {
                    Value::Object(map) => map.clone(),
                    _ => JsonObject::new(),
                };
                Tool::new(def.name, def.description, schema)
            })
            .collect()
    }

    async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        if !self.registry.has_tool(name) {
            log(LogLevel::Warn, &format!("Unknown tool requested: {}", name));
            return Err(McpError::invalid_params(format!("Unknown tool: {}", name), None));
        }
        let outcome = self.registry.call(name, arguments.map(Value::Object)).await;
        Ok(tool_result(outcome))
    }
}

fn tool_result(outcome: ToolOutcome) -> CallToolResult {
    let content = vec![Content::text(outcome.text())];
    if outcome.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

fn prompt_catalog() -> Vec<Prompt> {
    prompts::definitions()
        .into_iter()
        .map(|def| {
            let arguments = def
                .arguments
                .into_iter()
                .map(|arg| PromptArgument {
                    name: arg.name.to_string(),
                    description: Some(arg.description.to_string()),
                    required: Some(arg.required),
                })
                .collect();
            Prompt::new(def.name, Some(def.description), Some(arguments))
        })
        .collect()
}

fn prompt_result(name: &str, arguments: Option<JsonObject>) -> Result<GetPromptResult, McpError> {
    let arguments: HashMap<String, String> = arguments
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key, v.to_string())))
        .collect();
    let prompt = prompts::render(name, &arguments)
        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

    Ok(GetPromptResult {
        description: Some(prompt.description),
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, prompt.text)],
    })
}

impl ServerHandler for PiHoleMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Pi-hole statistics and domain intelligence. Tools: get_top_active_clients, \
                get_top_domains_for_client, get_top_domains, get_domain_dns_records, \
                get_domain_whois. Prompt: domain-osint."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tools(),
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.call(&request.name, request.arguments).await
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            next_cursor: None,
            prompts: prompt_catalog(),
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        prompt_result(&request.name, request.arguments)
    }
}

/// Last activity per live session, held to a fixed capacity. Ids that fall
/// out are returned so the caller can close them in the session manager.
pub struct SessionLedger {
    capacity: usize,
    idle_ttl: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl SessionLedger {
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            idle_ttl,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Records a new session and returns the ids evicted to make room,
    /// idle ones first, then least recently seen.
    pub fn open(&self, id: &str, now: Instant) -> Vec<String> {
        let mut seen = self.last_seen.lock();
        seen.insert(id.to_string(), now);
        let mut evicted = drain_idle(&mut seen, now, self.idle_ttl);

        while seen.len() > self.capacity {
            let oldest = seen
                .iter()
                .filter(|(key, _)| key.as_str() != id)
                .min_by_key(|(_, at)| **at)
                .map(|(key, _)| key.clone());
            let Some(oldest) = oldest else {
                break;
            };
            seen.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }

    pub fn touch(&self, id: &str, now: Instant) -> bool {
        match self.last_seen.lock().get_mut(id) {
            Some(at) => {
                *at = now;
                true
            }
            None => false,
        }
    }

    pub fn forget(&self, id: &str) -> bool {
        self.last_seen.lock().remove(id).is_some()
    }

    /// Removes and returns every session idle for longer than the TTL.
    pub fn expire(&self, now: Instant) -> Vec<String> {
        drain_idle(&mut self.last_seen.lock(), now, self.idle_ttl)
    }

    pub fn len(&self) -> usize {
        self.last_seen.lock().len()
    }
}

fn drain_idle(seen: &mut HashMap<String, Instant>, now: Instant, ttl: Duration) -> Vec<String> {
    let idle: Vec<String> = seen
        .iter()
        .filter(|(_, at)| now.saturating_duration_since(**at) > ttl)
        .map(|(key, _)| key.clone())
        .collect();
    for key in &idle {
        seen.remove(key);
    }
    idle
}

/// Bounds the sessions held by the transport's session manager.
pub struct SessionTracker {
    ledger: SessionLedger,
    manager: Arc<LocalSessionManager>,
}

impl SessionTracker {
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            ledger: SessionLedger::new(capacity, idle_ttl),
            manager: Arc::new(LocalSessionManager::default()),
        }
    }

    async fn close(&self, ids: Vec<String>, reason: &str) {
        for id in ids {
            let session: Arc<str> = Arc::from(id.as_str());
            match self.manager.close_session(&session).await {
                Ok(()) => log(
                    LogLevel::Info,
                    &format!("MCP session closed ({}) session_id={}", reason, id),
                ),
                Err(e) => log(
                    LogLevel::Warn,
                    &format!("Failed to close MCP session {}: {}", id, e),
                ),
            }
        }
    }
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn track_sessions(
    State(sessions): State<Arc<SessionTracker>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let known = session_header(request.headers());
    let agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    match &known {
        Some(id) if request.method() == Method::DELETE => {
            if sessions.ledger.forget(id) {
                log(
                    LogLevel::Info,
                    &format!("MCP session closed by client session_id={}", id),
                );
            }
        }
        Some(id) => {
            sessions.ledger.touch(id, Instant::now());
        }
        None => {}
    }

    let response = next.run(request).await;

    if known.is_none() {
        if let Some(id) = session_header(response.headers()) {
            let evicted = sessions.ledger.open(&id, Instant::now());
            log(
                LogLevel::Info,
                &format!(
                    "New MCP session remote={} user_agent={:?} session_id={} live={}",
                    remote,
                    agent,
                    id,
                    sessions.ledger.len()
                ),
            );
            sessions.close(evicted, "evicted").await;
        }
    }
    response
}

async fn sweep_idle(sessions: Arc<SessionTracker>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let idle = sessions.ledger.expire(Instant::now());
        sessions.close(idle, "idle").await;
    }
}

pub fn router(server: PiHoleMcp, sessions: Arc<SessionTracker>) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        sessions.manager.clone(),
        StreamableHttpServerConfig::default(),
    );
    Router::new()
        .nest_service(MCP_PATH, service)
        .layer(middleware::from_fn_with_state(sessions, track_sessions))
}

/// Serves MCP on an already bound listener until ctrl-c.
pub async fn serve(
    server: PiHoleMcp,
    listener: TcpListener,
    sessions: Arc<SessionTracker>,
) -> std::io::Result<()> {
    tokio::spawn(sweep_idle(sessions.clone()));
    let app = router(server, sessions).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                log(LogLevel::Info, "Shutdown signal received");
            }
        })
        .await
}

pub async fn run_server(
    bind_addr: &str,
    server: PiHoleMcp,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(bind_addr).await?;
    log(
        LogLevel::Info,
        &format!("MCP server listening on http://{}{}", bind_addr, MCP_PATH),
    );
    let sessions = Arc::new(SessionTracker::new(MAX_SESSIONS, SESSION_IDLE_TTL));
    serve(server, listener, sessions).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::DnsRecords;
    use crate::tools::stubs::{StubDns, StubPiHole, StubWhois};
    use rmcp::model::ErrorCode;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn server_with(dns: StubDns) -> (PiHoleMcp, Arc<StubDns>) {
        let dns = Arc::new(dns);
        let registry = Registry::new(
            Arc::new(StubPiHole::default()),
            dns.clone(),
            Arc::new(StubWhois::default()),
        );
        (PiHoleMcp::new(registry), dns)
    }

    fn arguments(value: Value) -> Option<JsonObject> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn tool_catalog_keeps_the_input_schemas() {
        let (server, _) = server_with(StubDns::default());
        let tools = server.tools();

        assert_eq!(tools.len(), 5);
        assert!(tools.iter().all(|t| t.input_schema.get("type") == Some(&json!("object"))));
        let whois = tools.iter().find(|t| t.name == "get_domain_whois").unwrap();
        assert_eq!(whois.input_schema.get("required"), Some(&json!(["domain"])));
    }

    #[tokio::test]
    async fn tool_calls_go_through_the_registry() {
        let (server, dns) = server_with(StubDns {
            records: Some(DnsRecords {
                domain: "example.com".to_string(),
                ns: vec!["ns1.example.com.".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        });

        let result = server
            .call("get_domain_dns_records", arguments(json!({"domain": "example.com"})))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(dns.calls.load(Ordering::SeqCst), 1);

        let result = server.call("get_domain_dns_records", None).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(dns.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_invalid_params_error() {
        let (server, _) = server_with(StubDns::default());
        let err = server.call("get_everything", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn osint_prompt_is_listed_and_rendered() {
        let catalog = prompt_catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, prompts::DOMAIN_OSINT);

        let prompt =
            prompt_result(prompts::DOMAIN_OSINT, arguments(json!({"domain": "example.com"}))).unwrap();
        assert_eq!(
            prompt.description.as_deref(),
            Some("OSINT analysis prompt for domain: example.com")
        );
        assert_eq!(prompt.messages.len(), 1);

        let err = prompt_result(prompts::DOMAIN_OSINT, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn ledger_evicts_least_recently_seen_beyond_capacity() {
        let ledger = SessionLedger::new(3, Duration::from_secs(600));
        let start = Instant::now();

        let mut evicted = Vec::new();
        for i in 0..5u64 {
            evicted.extend(ledger.open(&format!("s{}", i), start + Duration::from_secs(i)));
        }
        assert_eq!(ledger.len(), 3);
        assert_eq!(evicted, vec!["s0", "s1"]);

        assert!(ledger.touch("s2", start + Duration::from_secs(10)));
        let evicted = ledger.open("s5", start + Duration::from_secs(11));
        assert_eq!(evicted, vec!["s3"]);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn ledger_drops_idle_sessions() {
        let ttl = Duration::from_secs(60);
        let ledger = SessionLedger::new(100, ttl);
        let start = Instant::now();

        ledger.open("old", start);
        ledger.open("busy", start);
        ledger.touch("busy", start + Duration::from_secs(50));

        assert!(ledger.expire(start + Duration::from_secs(60)).is_empty());
        assert_eq!(ledger.expire(start + Duration::from_secs(61)), vec!["old"]);
        assert_eq!(ledger.len(), 1);

        let evicted = ledger.open("new", start + Duration::from_secs(200));
        assert_eq!(evicted, vec!["busy"]);
        assert!(ledger.forget("new"));
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn ten_thousand_sessions_stay_within_capacity() {
        let ledger = SessionLedger::new(MAX_SESSIONS, SESSION_IDLE_TTL);
        let start = Instant::now();
        let mut evicted = 0;
        for i in 0..10_000u64 {
            evicted += ledger.open(&i.to_string(), start + Duration::from_millis(i)).len();
        }
        assert_eq!(ledger.len(), MAX_SESSIONS);
        assert_eq!(evicted, 10_000 - MAX_SESSIONS);
    }

    async fn initialize(http: &reqwest::Client, url: &str) -> String {
        let response = http
            .post(url)
            .header("accept", "application/json, text/event-stream")
            .json(&json!({
                "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": {"protocolVersion": "2025-03-26", "capabilities": {}, "clientInfo": {"name": "t", "version": "0"}}
            }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        response
            .headers()
            .get(SESSION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn initialized(http: &reqwest::Client, url: &str, session: &str) -> reqwest::StatusCode {
        http.post(url)
            .header("accept", "application/json, text/event-stream")
            .header(SESSION_HEADER, session)
            .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .send()
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn http_transport_evicts_sessions_over_capacity() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sessions = Arc::new(SessionTracker::new(1, SESSION_IDLE_TTL));
        let (server, _) = server_with(StubDns::default());
        tokio::spawn(serve(server, listener, sessions.clone()));
        let url = format!("http://{}{}", addr, MCP_PATH);
        let http = reqwest::Client::new();

        let first = initialize(&http, &url).await;
        assert_eq!(sessions.ledger.len(), 1);
        let second = initialize(&http, &url).await;
        assert_ne!(first, second);
        assert_eq!(sessions.ledger.len(), 1);

        assert_eq!(initialized(&http, &url, &second).await, reqwest::StatusCode::ACCEPTED);
        assert!(initialized(&http, &url, &first).await.is_client_error());
    }
}
