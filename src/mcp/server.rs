//! Asana MCP Server - Exposes Asana task management via Model Context Protocol.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_async)]
#![allow(clippy::format_push_string)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::map_unwrap_or)]

use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use asana_tasks::api::{AsanaApi, AsanaClient};
use asana_tasks::clock::{Clock, SystemClock};
use asana_tasks::domain::{
    dates, is_canonical_gid, DirectoryCache, IdentityResolver, TaskLocator, DEFAULT_TTL_SECS,
};
use asana_tasks::entities::{CreateTaskRequest, TaskMatch, TaskPriority, UpdateTaskRequest};

/// JSON-RPC request structure
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC response structure
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// MCP server state
struct McpServer {
    api: Arc<dyn AsanaApi>,
    directory: Arc<DirectoryCache>,
    resolver: IdentityResolver,
    locator: TaskLocator,
    clock: Arc<dyn Clock>,
}

impl McpServer {
    fn new(api: Arc<dyn AsanaApi>, clock: Arc<dyn Clock>, directory_ttl_secs: i64) -> Self {
        let directory = Arc::new(DirectoryCache::with_ttl(
            Arc::clone(&api),
            Arc::clone(&clock),
            directory_ttl_secs,
        ));
        Self {
            resolver: IdentityResolver::new(Arc::clone(&directory)),
            locator: TaskLocator::new(Arc::clone(&api)),
            api,
            directory,
            clock,
        }
    }

    async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id).await,
            "tools/list" => self.handle_tools_list(id).await,
            "tools/call" => self.handle_tool_call(id, request.params.as_ref()).await,
            _ => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: "Method not found".to_string(),
                    data: None,
                }),
            },
        }
    }

    async fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "asana-tasks-mcp",
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),
            error: None,
        }
    }

    async fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools = json!({
            "tools": [
                {
                    "name": "create_task",
                    "description": "Create a new Asana task",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "name": {
                                "type": "string",
                                "description": "Task name"
                            },
                            "notes": {
                                "type": "string",
                                "description": "Task description"
                            },
                            "project_gid": {
                                "type": "string",
                                "description": "Project to add the task to"
                            },
                            "assignee": {
                                "type": "string",
                                "description": "Assignee: a name, partial name, email, or gid"
                            },
                            "due_date": {
                                "type": "string",
                                "description": "Due date: YYYY-MM-DD, 'today', 'tomorrow', or 'N days'"
                            },
                            "priority": {
                                "type": "string",
                                "description": "Priority (low, medium, high, urgent)"
                            }
                        },
                        "required": ["name"]
                    }
                },
                {
                    "name": "update_task",
                    "description": "Update an existing task, found by gid or by name within a project",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "task": {
                                "type": "string",
                                "description": "Task gid, or a task name to search for"
                            },
                            "project_gid": {
                                "type": "string",
                                "description": "Project to search in when 'task' is a name"
                            },
                            "name": {
                                "type": "string",
                                "description": "New task name"
                            },
                            "notes": {
                                "type": "string",
                                "description": "New task description"
                            },
                            "completed": {
                                "type": "boolean",
                                "description": "Mark complete or incomplete"
                            },
                            "due_date": {
                                "type": "string",
                                "description": "New due date: YYYY-MM-DD, 'today', 'tomorrow', or 'N days'"
                            },
                            "priority": {
                                "type": "string",
                                "description": "Priority (low, medium, high, urgent)"
                            }
                        },
                        "required": ["task"]
                    }
                },
                {
                    "name": "get_task",
                    "description": "Get details of a task, found by gid or by name within a project",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "task": {
                                "type": "string",
                                "description": "Task gid, or a task name to search for"
                            },
                            "project_gid": {
                                "type": "string",
                                "description": "Project to search in when 'task' is a name"
                            }
                        },
                        "required": ["task"]
                    }
                },
                {
                    "name": "search_tasks",
                    "description": "Full-text task search in the workspace",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "query": {
                                "type": "string",
                                "description": "Search text"
                            },
                            "project_gid": {
                                "type": "string",
                                "description": "Restrict the search to one project"
                            },
                            "completed": {
                                "type": "boolean",
                                "description": "Search completed tasks instead of incomplete (default: false)"
                            }
                        },
                        "required": ["query"]
                    }
                },
                {
                    "name": "list_projects",
                    "description": "List projects visible to the authenticated user",
                    "inputSchema": {
                        "type": "object",
                        "properties": {}
                    }
                },
                {
                    "name": "list_users",
                    "description": "List members of the workspace",
                    "inputSchema": {
                        "type": "object",
                        "properties": {}
                    }
                },
                {
                    "name": "refresh_user_cache",
                    "description": "Invalidate and rebuild the workspace member cache used for assignee resolution",
                    "inputSchema": {
                        "type": "object",
                        "properties": {}
                    }
                },
                {
                    "name": "greet",
                    "description": "Greet someone by name",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "name": {
                                "type": "string",
                                "description": "Name to greet"
                            }
                        },
                        "required": ["name"]
                    }
                },
                {
                    "name": "echo",
                    "description": "Echo the provided text back",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "text": {
                                "type": "string",
                                "description": "Text to echo"
                            }
                        },
                        "required": ["text"]
                    }
                },
                {
                    "name": "get_current_time",
                    "description": "Get the current UTC time",
                    "inputSchema": {
                        "type": "object",
                        "properties": {}
                    }
                },
                {
                    "name": "format_json",
                    "description": "Pretty-print a JSON string",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "json": {
                                "type": "string",
                                "description": "JSON text to format"
                            },
                            "indent": {
                                "type": "integer",
                                "description": "Spaces per indent level (default: 2)"
                            }
                        },
                        "required": ["json"]
                    }
                }
            ]
        });

        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(tools),
            error: None,
        }
    }

    async fn handle_tool_call(&self, id: Value, params: Option<&Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32602,
                    message: "Missing params".to_string(),
                    data: None,
                }),
            };
        };

        let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        let result = match tool_name {
            "create_task" => self.tool_create_task(&arguments).await,
            "update_task" => self.tool_update_task(&arguments).await,
            "get_task" => self.tool_get_task(&arguments).await,
            "search_tasks" => self.tool_search_tasks(&arguments).await,
            "list_projects" => self.tool_list_projects(&arguments).await,
            "list_users" => self.tool_list_users(&arguments).await,
            "refresh_user_cache" => self.tool_refresh_user_cache(&arguments).await,
            "greet" => self.tool_greet(&arguments).await,
            "echo" => self.tool_echo(&arguments).await,
            "get_current_time" => self.tool_get_current_time(&arguments).await,
            "format_json" => self.tool_format_json(&arguments).await,
            _ => Err(format!("Unknown tool: {tool_name}")),
        };

        match result {
            Ok(content) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: Some(json!({
                    "content": [{
                        "type": "text",
                        "text": content
                    }]
                })),
                error: None,
            },
            Err(e) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: Some(json!({
                    "content": [{
                        "type": "text",
                        "text": format!("Error: {}", e)
                    }],
                    "isError": true
                })),
                error: None,
            },
        }
    }

    /// Turn a task reference into a gid: canonical gids pass straight through,
    /// anything else is searched by name within the given project.
    async fn locate_task_gid(
        &self,
        reference: &str,
        project_gid: Option<&str>,
    ) -> Result<String, String> {
        if is_canonical_gid(reference) {
            return Ok(reference.to_string());
        }

        let project = project_gid.ok_or(
            "Task is not a gid; pass 'project_gid' so it can be searched by name",
        )?;

        match self
            .locator
            .locate(reference, project)
            .await
            .map_err(|e| e.to_string())?
        {
            TaskMatch::Found(gid) => Ok(gid),
            TaskMatch::NotFound => Err(format!(
                "No incomplete task matching '{reference}' found in project {project}"
            )),
            TaskMatch::Ambiguous(candidates) => {
                let mut message =
                    format!("Multiple tasks match '{reference}'; retry with a task gid:\n");
                for candidate in &candidates {
                    message.push_str(&format!("  - {} ({})\n", candidate.name, candidate.gid));
                }
                Err(message)
            }
        }
    }

    fn normalize_due_date(&self, expression: &str) -> String {
        dates::normalize(expression, self.clock.now().date_naive())
    }

    async fn tool_create_task(&self, args: &Value) -> Result<String, String> {
        let name = args
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or("Missing 'name' parameter")?;
        let notes = args.get("notes").and_then(|v| v.as_str()).unwrap_or("");
        let project_gid = args.get("project_gid").and_then(|v| v.as_str());
        let assignee = args.get("assignee").and_then(|v| v.as_str());
        let due_date = args.get("due_date").and_then(|v| v.as_str());
        let priority = args
            .get("priority")
            .and_then(|v| v.as_str())
            .and_then(TaskPriority::parse);

        let assignee = match assignee {
            // Unresolved references pass through unchanged; they may be a
            // valid email or gid the member cache doesn't know about.
            Some(reference) => Some(self.resolver.resolve(reference).await.into_inner()),
            None => None,
        };

        let req = CreateTaskRequest {
            name: name.to_string(),
            notes: notes.to_string(),
            projects: project_gid.map(String::from).into_iter().collect(),
            assignee,
            due_on: due_date.map(|d| self.normalize_due_date(d)),
            priority,
        };

        let task = self.api.create_task(&req).await.map_err(|e| e.to_string())?;

        Ok(format!(
            "Created task {} - {}\n\n{}",
            task.gid,
            task.name,
            serde_json::to_string_pretty(&task).unwrap_or_else(|_| "{}".to_string())
        ))
    }

    async fn tool_update_task(&self, args: &Value) -> Result<String, String> {
        let reference = args
            .get("task")
            .and_then(|v| v.as_str())
            .ok_or("Missing 'task' parameter")?;
        let project_gid = args.get("project_gid").and_then(|v| v.as_str());

        let req = UpdateTaskRequest {
            name: args
                .get("name")
                .and_then(|v| v.as_str())
                .map(String::from),
            notes: args
                .get("notes")
                .and_then(|v| v.as_str())
                .map(String::from),
            completed: args.get("completed").and_then(|v| v.as_bool()),
            due_on: args
                .get("due_date")
                .and_then(|v| v.as_str())
                .map(|d| self.normalize_due_date(d)),
            priority: args
                .get("priority")
                .and_then(|v| v.as_str())
                .and_then(TaskPriority::parse),
        };

        if req.is_empty() {
            return Err("No fields to update".to_string());
        }

        let gid = self.locate_task_gid(reference, project_gid).await?;
        let task = self
            .api
            .update_task(&gid, &req)
            .await
            .map_err(|e| e.to_string())?;

        Ok(format!(
            "Updated task {}\n\n{}",
            task.gid,
            serde_json::to_string_pretty(&task).unwrap_or_else(|_| "{}".to_string())
        ))
    }

    async fn tool_get_task(&self, args: &Value) -> Result<String, String> {
        let reference = args
            .get("task")
            .and_then(|v| v.as_str())
            .ok_or("Missing 'task' parameter")?;
        let project_gid = args.get("project_gid").and_then(|v| v.as_str());

        let gid = self.locate_task_gid(reference, project_gid).await?;
        let task = self.api.get_task(&gid).await.map_err(|e| e.to_string())?;

        Ok(serde_json::to_string_pretty(&task).unwrap_or_else(|_| "{}".to_string()))
    }

    async fn tool_search_tasks(&self, args: &Value) -> Result<String, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or("Missing 'query' parameter")?;
        let project_gid = args.get("project_gid").and_then(|v| v.as_str());
        let completed = args
            .get("completed")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let tasks = self
            .api
            .search_tasks(project_gid, query, completed)
            .await
            .map_err(|e| e.to_string())?;

        if tasks.is_empty() {
            return Ok("No matching tasks".to_string());
        }
        Ok(serde_json::to_string_pretty(&tasks).unwrap_or_else(|_| "[]".to_string()))
    }

    async fn tool_list_projects(&self, _args: &Value) -> Result<String, String> {
        let projects = self.api.list_projects().await.map_err(|e| e.to_string())?;
        Ok(serde_json::to_string_pretty(&projects).unwrap_or_else(|_| "[]".to_string()))
    }

    async fn tool_list_users(&self, _args: &Value) -> Result<String, String> {
        let members = self
            .api
            .workspace_members()
            .await
            .map_err(|e| e.to_string())?;
        Ok(serde_json::to_string_pretty(&members).unwrap_or_else(|_| "[]".to_string()))
    }

    async fn tool_refresh_user_cache(&self, _args: &Value) -> Result<String, String> {
        let snapshot = self.directory.refresh().await.map_err(|e| e.to_string())?;
        Ok(format!(
            "User cache refreshed: {} aliases",
            snapshot.aliases().count()
        ))
    }

    async fn tool_greet(&self, args: &Value) -> Result<String, String> {
        let name = args
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or("Missing 'name' parameter")?;
        Ok(format!("Hello, {name}!"))
    }

    async fn tool_echo(&self, args: &Value) -> Result<String, String> {
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or("Missing 'text' parameter")?;
        Ok(text.to_string())
    }

    async fn tool_get_current_time(&self, _args: &Value) -> Result<String, String> {
        Ok(self.clock.now().to_rfc3339())
    }

    async fn tool_format_json(&self, args: &Value) -> Result<String, String> {
        let text = args
            .get("json")
            .and_then(|v| v.as_str())
            .ok_or("Missing 'json' parameter")?;
        let indent = args
            .get("indent")
            .and_then(|v| v.as_u64())
            .unwrap_or(2)
            .min(10) as usize;

        let value: Value =
            serde_json::from_str(text).map_err(|e| format!("Invalid JSON: {e}"))?;
        pretty_with_indent(&value, indent)
    }
}

fn pretty_with_indent(value: &Value, indent: usize) -> Result<String, String> {
    let spaces = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(spaces.as_bytes());
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser).map_err(|e| e.to_string())?;
    String::from_utf8(out).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout is the protocol channel, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let token =
        std::env::var("ASANA_ACCESS_TOKEN").context("ASANA_ACCESS_TOKEN must be set")?;
    let workspace_gid =
        std::env::var("ASANA_WORKSPACE_GID").context("ASANA_WORKSPACE_GID must be set")?;
    let directory_ttl_secs = std::env::var("ASANA_DIRECTORY_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TTL_SECS);

    let api: Arc<dyn AsanaApi> = Arc::new(AsanaClient::new(token, workspace_gid));
    let server = McpServer::new(api, Arc::new(SystemClock), directory_ttl_secs);

    // Read from stdin, write to stdout (JSON-RPC over stdio)
    let stdin = std::io::stdin();
    let reader = BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout();

    for line in reader.lines() {
        let Ok(line) = line else { break };

        if line.is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                let error_response = JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    id: Value::Null,
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32700,
                        message: format!("Parse error: {e}"),
                        data: None,
                    }),
                };
                let _ = writeln!(
                    stdout,
                    "{}",
                    serde_json::to_string(&error_response).unwrap()
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let response = server.handle_request(&request).await;
        let _ = writeln!(stdout, "{}", serde_json::to_string(&response).unwrap());
        let _ = stdout.flush();
    }

    Ok(())
}
