// File: testing-framework/tests/common/mod.rs
//
// Shared fixtures for integration tests: throw-away shell scripts standing in
// for `neard` and `near`, and a minimal JSON-RPC server standing in for the
// node's RPC endpoint.

#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A syntactically valid transaction hash (44 base58 characters)
pub const TX_HASH: &str = "9yMeSAHvAWUzuTJtzTWR2kAZD4grYRbtC4y2ToTKcRmK";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write an executable script into `dir`
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// How the fake node behaves on `run`
pub enum NodeRun {
    /// Stay alive until SIGTERM
    Sleep,
    /// Exit at once with the given code
    Exit(i32),
    /// Ignore SIGTERM, only die to SIGKILL
    IgnoreTerm,
}

/// Fake node binary: `init` writes a config.json, `run` behaves per `run`.
/// Every invocation is appended to `node.log` next to the script.
#[cfg(unix)]
pub fn fake_node(dir: &Path, run: NodeRun) -> PathBuf {
    fake_node_with_init(dir, run, "")
}

/// Fake node whose `init` runs `init_prelude` first (e.g. to fail)
#[cfg(unix)]
pub fn fake_node_with_init(dir: &Path, run: NodeRun, init_prelude: &str) -> PathBuf {
    let run_body = match run {
        NodeRun::Sleep => "exec sleep 30".to_string(),
        NodeRun::Exit(code) => format!("exit {}", code),
        NodeRun::IgnoreTerm => "trap '' TERM\n    while true; do sleep 1; done".to_string(),
    };

    let script = format!(
        r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/node.log"
case "$3" in
  init)
    {init_prelude}
    mkdir -p "$2"
    printf '{{"rpc": {{"addr": "0.0.0.0:3030"}}, "chain_id": "%s"}}' "$5" > "$2/config.json"
    exit 0
    ;;
  run)
    {run_body}
    ;;
esac
exit 64
"#,
        init_prelude = init_prelude,
        run_body = run_body,
    );
    write_script(dir, "neard", &script)
}

/// Fake `near` CLI covering the verbs the helpers use.
/// Every invocation is appended to `cli.log` next to the script.
#[cfg(unix)]
pub fn fake_cli(dir: &Path) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/cli.log"
case "$1" in
  create-account)
    if [ "$2" = "taken.test.near" ]; then
      echo "Account taken.test.near already exists" >&2
      exit 1
    fi
    echo "Account $2 for network \"$NEAR_ENV\" was created."
    ;;
  deploy)
    if [ "$2" = "broken.test.near" ]; then
      echo "deploy rejected by node" >&2
      exit 1
    fi
    echo "Deploying contract $3 in $2"
    echo "Transaction Id {hash}"
    echo "Done deploying to $2"
    ;;
  call)
    case "$3" in
      fail_init|panic_method)
        echo "Scheduling a call: $2.$3($4)"
        echo "Log [$2]: about to panic"
        echo "Smart contract panicked: boom" >&2
        exit 1
        ;;
      mint)
        echo "Scheduling a call: $2.$3($4)"
        echo 'Log [nft.test.near]: EVENT_JSON:{{"standard":"nep171","version":"1.0.0","event":"nft_mint","data":[{{"owner_id":"alice.test.near","token_ids":["1","2"]}}]}}'
        echo "Transaction Id {hash}"
        ;;
      retry_then_ok)
        echo "Scheduling a call: $2.$3($4)"
        echo "Log [$2]: error: first attempt timed out, retried"
        echo "Transaction Id {hash}"
        ;;
      *)
        echo "Scheduling a call: $2.$3($4)"
        echo "Log [$2]: $3 called by $6"
        echo "Transaction Id {hash}"
        ;;
    esac
    ;;
  view)
    case "$3" in
      get_json) echo '{{"count": 3}}' ;;
      get_text) echo "hello world" ;;
      echo_args) echo "$4" ;;
      env) printf '{{"near_env":"%s","rpc":"%s","home":"%s"}}\n' "$NEAR_ENV" "$NEAR_CLI_LOCALNET_RPC_SERVER_URL" "$NEAR_HOME" ;;
      *)
        echo "MethodNotFound: $3" >&2
        exit 1
        ;;
    esac
    ;;
  state)
    if [ "$2" = "ghost.test.near" ]; then
      echo "Account ghost.test.near does not exist" >&2
      exit 1
    fi
    echo "Account $2"
    echo "{{"
    echo "  amount: '100000000000000000000000000',"
    echo "  locked: '0',"
    echo "}}"
    ;;
  *)
    exit 64
    ;;
esac
"#,
        hash = TX_HASH,
    );
    write_script(dir, "near", &script)
}

/// Lines of `<dir>/<name>.log` written by the fake binaries
pub fn read_log(dir: &Path, name: &str) -> Vec<String> {
    std::fs::read_to_string(dir.join(format!("{}.log", name)))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// What the fake RPC server answers
#[derive(Clone)]
pub enum Reply {
    /// `{"jsonrpc": "2.0", "id": <request id>, "result": <value>}`
    Result(Value),
    /// The given body, verbatim
    Raw(Value),
}

/// Minimal HTTP/1.1 JSON-RPC server on 127.0.0.1
pub struct FakeRpcServer {
    pub port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
    handle: JoinHandle<()>,
}

impl FakeRpcServer {
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let reply = reply.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, reply, recorded).await;
                });
            }
        });

        Self {
            port,
            requests,
            handle,
        }
    }

    /// Server answering `status` the way a ready node does
    pub async fn ready_node() -> Self {
        Self::start(Reply::Result(json!({
            "chain_id": "localnet",
            "sync_info": {"latest_block_height": 1, "syncing": false},
        })))
        .await
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Decoded request bodies, in arrival order
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }
}

impl Drop for FakeRpcServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    reply: Reply,
    recorded: Arc<Mutex<Vec<Value>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = (header_end + content_length).min(buf.len());
    let request: Value = serde_json::from_slice(&buf[header_end..end]).unwrap_or(Value::Null);
    recorded.lock().push(request.clone());

    let body = match reply {
        Reply::Result(result) => json!({
            "jsonrpc": "2.0",
            "id": request.get("id").cloned().unwrap_or(Value::Null),
            "result": result,
        }),
        Reply::Raw(body) => body,
    }
    .to_string();

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
