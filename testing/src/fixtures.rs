use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::{ContainerAsync, GenericImage, ImageExt, runners::AsyncRunner};
use tokio::sync::OnceCell;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Name unique within the process and across runs sharing one container.
pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!("{prefix}_{nanos}_{id}")
}

pub struct QdrantFixture {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    grpc_url: String,
    http_url: String
}

impl QdrantFixture {
    /// gRPC endpoint (6334), used by `qdrant-client`.
    pub fn grpc_url(&self) -> &str {
        &self.grpc_url
    }

    /// REST endpoint (6333).
    pub fn http_url(&self) -> &str {
        &self.http_url
    }
}

static QDRANT: OnceCell<Option<QdrantFixture>> = OnceCell::const_new();

/// Shared Qdrant container, or `None` when Docker is not available.
pub async fn qdrant() -> Option<&'static QdrantFixture> {
    QDRANT
        .get_or_init(|| async {
            let container_result = GenericImage::new("qdrant/qdrant", "latest")
                .with_exposed_port(ContainerPort::Tcp(6333))
                .with_exposed_port(ContainerPort::Tcp(6334))
                .with_wait_for(WaitFor::message_on_stdout("Qdrant gRPC listening on 6334"))
                .with_startup_timeout(std::time::Duration::from_secs(60))
                .start()
                .await;

            match container_result {
                Ok(container) => {
                    let http_port = container.get_host_port_ipv4(6333).await.ok()?;
                    let grpc_port = container.get_host_port_ipv4(6334).await.ok()?;
                    let http_url = format!("http://localhost:{http_port}");
                    let grpc_url = format!("http://localhost:{grpc_port}");

                    if let Err(e) = verify_qdrant_connection(&http_url).await {
                        tracing::warn!("Qdrant connection verification failed: {:?}", e);
                        return None;
                    }

                    tracing::info!("Qdrant fixture started - HTTP: {}, gRPC: {}", http_port, grpc_port);
                    Some(QdrantFixture {
                        container,
                        grpc_url,
                        http_url
                    })
                }
                Err(e) => {
                    tracing::warn!("Failed to start Qdrant container: {:?}", e);
                    None
                }
            }
        })
        .await
        .as_ref()
}

async fn verify_qdrant_connection(http_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let health_url = format!("{http_url}/healthz");
    for attempt in 0..10 {
        match reqwest::get(&health_url).await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => {
                if attempt < 9 {
                    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                }
            }
        }
    }
    Err("Qdrant health check failed after 10 attempts".into())
}
