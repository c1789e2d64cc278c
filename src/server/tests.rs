use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use super::*;
use crate::compile::testing::FakeCompiler;
use crate::config::{BuildOptions, Mode};
use crate::module::{LoadContext, NOT_FOUND_MARKUP, PageRegistry, RegistryLoader, loader_fn, page_fn};
use crate::payload::Value;
use crate::route::PageEventKind;
use crate::runtime::Runtime;
use crate::utils::html::escape;

const PAGES: &[&str] = &["index.tsx", "about.tsx", "docs/[id].tsx", "fail.tsx", "slow.tsx", "boom.tsx"];

async fn explode(_: LoadContext) -> anyhow::Result<Value> {
    panic!("loader exploded")
}

fn registry() -> PageRegistry {
    PageRegistry::new()
        .page("index.tsx", page_fn(|_| Ok("<h1>Home</h1>".into())))
        .page(
            "about.tsx",
            page_fn(|scope| {
                scope.head().set_title("About");
                Ok("<h1>About</h1>".into())
            }),
        )
        .page_with_loader(
            "docs/[id].tsx",
            page_fn(|scope| {
                let title = scope
                    .route_data()
                    .and_then(|d| d.get("title"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(format!("<h1>{}</h1>", escape(&title)))
            }),
            loader_fn(|ctx: LoadContext| async move {
                let title = if ctx.params["id"] == "abc" { "X" } else { "</script>" };
                Ok::<_, anyhow::Error>(Value::object([("title", Value::from(title))]))
            }),
        )
        .page_with_loader(
            "fail.tsx",
            page_fn(|_| Ok("<h1>unreachable</h1>".into())),
            loader_fn(|_| async { Err::<Value, _>(anyhow::anyhow!("database offline")) }),
        )
        .page_with_loader(
            "boom.tsx",
            page_fn(|_| Ok("<h1>unreachable</h1>".into())),
            loader_fn(explode),
        )
        .page_with_loader(
            "slow.tsx",
            page_fn(|_| Ok("<h1>slow</h1>".into())),
            loader_fn(|_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, anyhow::Error>(Value::Null)
            }),
        )
}

struct Site {
    dir: TempDir,
    runtime: Arc<Runtime>,
}

impl Site {
    fn new(mode: Mode) -> Self {
        let dir = TempDir::new().unwrap();
        for page in PAGES {
            let path = dir.path().join("pages").join(page);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "export default () => null;\n").unwrap();
        }
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(dir.path().join("public/robots.txt"), "User-agent: *\n").unwrap();

        let mut options = BuildOptions::new(dir.path(), mode);
        options.loader_timeout = Duration::from_millis(200);
        let runtime = Arc::new(Runtime::new(
            Arc::new(options),
            Arc::new(FakeCompiler::default()),
            Arc::new(RegistryLoader::new(registry())),
        ));
        runtime.prepare().unwrap();
        Self { dir, runtime }
    }

    async fn built(mode: Mode) -> Self {
        let site = Self::new(mode);
        site.runtime.rebuild().await.unwrap();
        site
    }

    async fn get(&self, url: &str) -> Reply {
        handle(&self.runtime, &Incoming::get(url)).await
    }
}

#[tokio::test]
async fn test_static_page_renders() {
    let site = Site::built(Mode::Development).await;
    let reply = site.get("/about").await;
    let html = reply.text();

    assert_eq!(reply.status, 200);
    assert!(html.contains("<div id=\"_kiln\"><h1>About</h1></div>"));
    assert!(html.contains("<title>About</title>"));
    assert!(!html.contains(NOT_FOUND_MARKUP));
    assert_eq!(reply.header_value("content-type"), Some("text/html; charset=utf-8"));
    assert!(reply.header_value(BUILD_HEADER).is_some());
}

#[tokio::test]
async fn test_unknown_path_renders_catch_all() {
    let site = Site::built(Mode::Development).await;
    let reply = site.get("/nonexistent").await;
    assert_eq!(reply.status, 404);
    assert!(reply.text().contains(NOT_FOUND_MARKUP));
}

#[tokio::test]
async fn test_json_negotiation_returns_route_data() {
    let site = Site::built(Mode::Development).await;
    let request = Incoming::get("/docs/abc").with_accept("application/json, text/plain");
    let reply = handle(&site.runtime, &request).await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.header_value("Content-Type"), Some("application/json"));
    assert_eq!(reply.text(), r#"{"/docs/abc":{"title":"X"}}"#);

    let missing = handle(&site.runtime, &Incoming::get("/nope").with_accept("application/json")).await;
    assert_eq!(missing.status, 404);
    assert_eq!(missing.text(), "{}");
}

#[tokio::test]
async fn test_loader_data_embedded_in_state() {
    let site = Site::built(Mode::Development).await;
    let html = site.get("/docs/xss").await.text();

    assert!(html.contains("window.__KILN_STATE__ = "));
    assert!(html.contains(r#""\u002Fdocs\u002Fxss":{"title":"\u003C\u002Fscript\u003E"}"#));
    assert_eq!(html.matches("</script>").count(), 2);
}

#[tokio::test]
async fn test_loader_rejection_is_contained() {
    let site = Site::built(Mode::Development).await;
    let reply = site.get("/fail").await;
    assert_eq!(reply.status, 500);
    assert!(reply.text().contains("database offline"));

    let after = site.get("/about").await;
    assert_eq!(after.status, 200);
}

#[tokio::test]
async fn test_loader_panic_is_contained() {
    let site = Site::built(Mode::Development).await;
    let reply = site.get("/boom").await;
    assert_eq!(reply.status, 500);
    assert!(reply.text().contains("panicked: loader exploded"));

    let after = site.get("/about").await;
    assert_eq!(after.status, 200);
}

#[tokio::test]
async fn test_loader_timeout() {
    let site = Site::built(Mode::Development).await;
    let reply = site.get("/slow").await;
    assert_eq!(reply.status, 500);
    assert!(reply.text().contains("timed out"));
}

#[tokio::test]
async fn test_production_error_hides_diagnostic() {
    let site = Site::built(Mode::Production).await;
    let reply = site.get("/fail").await;
    assert_eq!(reply.status, 500);
    assert!(!reply.text().contains("database offline"));
    assert!(reply.header_value("Cache-Control").is_none());

    let json = handle(&site.runtime, &Incoming::get("/fail").with_accept("application/json")).await;
    assert_eq!(json.text(), r#"{"error":"500 Internal Server Error"}"#);
}

#[tokio::test]
async fn test_unlinked_page_falls_to_catch_all() {
    let site = Site::built(Mode::Development).await;
    assert_eq!(site.get("/about").await.status, 200);

    fs::remove_file(site.dir.path().join("pages/about.tsx")).unwrap();
    assert!(site.runtime.apply_file_event(PageEventKind::Removed, "about.tsx"));
    site.runtime.rebuild().await.unwrap();

    let reply = site.get("/about").await;
    assert_eq!(reply.status, 404);
    assert!(reply.text().contains(NOT_FOUND_MARKUP));
}

#[tokio::test]
async fn test_head_has_no_body() {
    let site = Site::built(Mode::Development).await;
    let request = Incoming {
        method: Method::Head,
        ..Incoming::get("/about")
    };
    let reply = handle(&site.runtime, &request).await;
    assert_eq!(reply.status, 200);
    assert!(reply.body.is_empty());
    assert_eq!(reply.header_value("Content-Type"), Some("text/html; charset=utf-8"));
}

#[tokio::test]
async fn test_other_methods_rejected() {
    let site = Site::built(Mode::Development).await;
    let request = Incoming {
        method: Method::Other("POST".into()),
        ..Incoming::get("/about")
    };
    let reply = handle(&site.runtime, &request).await;
    assert_eq!(reply.status, 405);
    assert_eq!(reply.header_value("Allow"), Some("GET, HEAD"));
}

#[tokio::test]
async fn test_unavailable_before_first_build() {
    let site = Site::new(Mode::Development);
    assert_eq!(site.get("/about").await.status, 503);
    assert_eq!(site.get("/_kiln/client-entry.js").await.status, 503);
    // Public files do not depend on a build
    assert_eq!(site.get("/robots.txt").await.status, 200);
}

#[tokio::test]
async fn test_static_mounts() {
    let site = Site::built(Mode::Development).await;

    let client = site.get("/_kiln/client-entry.js?t=1").await;
    assert_eq!(client.status, 200);
    assert_eq!(client.header_value("Content-Type"), Some("text/javascript; charset=utf-8"));

    let robots = site.get("/robots.txt").await;
    assert_eq!(robots.text(), "User-agent: *\n");

    assert_eq!(site.get("/_kiln/missing.js").await.status, 404);
}

#[tokio::test]
async fn test_traversal_rejected() {
    let site = Site::built(Mode::Development).await;
    fs::write(site.dir.path().join("secret.txt"), "secret").unwrap();

    for url in ["/_kiln/../../secret.txt", "/..%2Fsecret.txt", "/_kiln/%2E%2E/%2E%2E/secret.txt"] {
        let reply = site.get(url).await;
        assert!(!reply.text().contains("secret"), "{url}");
        assert_ne!(reply.status, 200, "{url}");
    }
}
