//! Rendering pipeline tests
//!
//! Each test lays out a small site in a temp directory and drives
//! [`Engine::handle`] directly:
//! - Root and parameterized routes with hook data
//! - The not-found chain (status page, default page, literal text)
//! - Server errors from hooks and templates
//! - Page cache hits, precompression and write failures
//! - Dev-only reload script injection

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strata::cache::compress::gunzip;
use strata::*;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn engine(config: Config, env: Environment) -> Engine {
    Engine::builder(config)
        .runtime(RuntimeContext::new(env))
        .build()
}

fn prod(root: &Path) -> Engine {
    engine(Config::for_site(root), Environment::Prod)
}

fn cached_config(root: &Path) -> Config {
    let mut config = Config::for_site(root);
    config.cache.enabled = true;
    config
}

fn page(outcome: Outcome) -> Rendered {
    match outcome {
        Outcome::Page(rendered) => rendered,
        other => panic!("expected a page, got {:?}", other),
    }
}

fn body(outcome: Outcome) -> String {
    String::from_utf8(page(outcome).body).unwrap()
}

#[tokio::test]
async fn test_root_without_routes_renders_top_level_index() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "home {{ params | json_encode() }}");

    let engine = prod(tmp.path());
    assert!(engine.dispatcher().snapshot().is_empty());

    assert_eq!(body(engine.handle("/", false).await), "home {}");
    assert_eq!(body(engine.handle("", false).await), "home {}");
}

#[tokio::test]
async fn test_hook_data_and_params_reach_template() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/greet/_name/index.html", "{{ Title }}, {{ params.name }}");
    write(tmp.path(), "routes/greet/_name/index.server.json", r#"{"Title": "Hello"}"#);

    let engine = prod(tmp.path());
    assert_eq!(body(engine.handle("/greet/world", false).await), "Hello, world");
}

#[tokio::test]
async fn test_layout_and_components_compose() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "components/layouts/layout.html",
        r#"<html><body>{% include "partials/nav.html" %}{% include "page" %}</body></html>"#,
    );
    write(tmp.path(), "components/partials/nav.html", "<nav>{{ Title }}</nav>");
    write(tmp.path(), "routes/index.html", "<main>home</main>");
    write(tmp.path(), "routes/index.server.json", r#"{"Title": "Site"}"#);

    let engine = prod(tmp.path());
    assert_eq!(
        body(engine.handle("/", false).await),
        "<html><body><nav>Site</nav><main>home</main></body></html>"
    );
}

#[tokio::test]
async fn test_not_found_chain() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/gone/index.html", "never shown");
    write(tmp.path(), "routes/gone/index.server.json", r#"{"notFound": true}"#);
    write(tmp.path(), "routes/_error/404.html", "custom {{ StatusCode }} {{ Path | safe }}");
    write(tmp.path(), "routes/_error/index.html", "default {{ Title }}");

    let engine = prod(tmp.path());

    let Outcome::Error(err) = engine.handle("/gone", false).await else {
        panic!("expected error page");
    };
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.body, "custom 404 /gone");

    fs::remove_file(tmp.path().join("routes/_error/404.html")).unwrap();
    let Outcome::Error(err) = engine.handle("/gone", false).await else {
        panic!("expected error page");
    };
    assert_eq!(err.body, "default 404 - Page not found");

    fs::remove_file(tmp.path().join("routes/_error/index.html")).unwrap();
    let Outcome::Error(err) = engine.handle("/gone", false).await else {
        panic!("expected error page");
    };
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.body, "404 - Page not found");
    assert!(!err.is_html);
}

#[tokio::test]
async fn test_error_directory_is_not_a_route() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/_error/index.html", "error page");

    let engine = prod(tmp.path());
    assert!(engine.dispatcher().snapshot().is_empty());

    let outcome = engine.handle("/anything", false).await;
    assert_eq!(outcome.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_page_file_is_not_found() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/about/index.html", "about");

    let engine = prod(tmp.path());
    fs::remove_file(tmp.path().join("routes/about/index.html")).unwrap();

    // Route is still in the table until the next rebuild
    assert!(engine.dispatcher().resolve("about").is_some());
    assert_eq!(engine.handle("/about", false).await.status(), StatusCode::NOT_FOUND);

    // Root page missing as well
    assert_eq!(engine.handle("/", false).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hook_failure_is_server_error() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "x");
    write(tmp.path(), "routes/index.server.json", "{not json");

    let engine = prod(tmp.path());
    let Outcome::ServerError(message) = engine.handle("/", false).await else {
        panic!("expected server error");
    };
    assert!(message.contains("invalid JSON"), "{}", message);
}

#[tokio::test]
async fn test_template_failures_are_server_errors() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/parse/index.html", "{% for %}");
    write(tmp.path(), "routes/exec/index.html", r#"{% include "missing.html" %}"#);

    let engine = prod(tmp.path());

    let Outcome::ServerError(message) = engine.handle("/parse", false).await else {
        panic!("expected server error");
    };
    assert!(message.starts_with("template error"), "{}", message);

    let Outcome::ServerError(message) = engine.handle("/exec", false).await else {
        panic!("expected server error");
    };
    assert!(message.starts_with("template execution error"), "{}", message);
}

struct Recording {
    seen: Mutex<Vec<(Params, bool)>>,
    delay: Duration,
}

#[async_trait]
impl HookExecutor for Recording {
    async fn execute(&self, _hook: &Path, params: &Params, dev: bool) -> Result<HookData, HookError> {
        self.seen.lock().unwrap().push((params.clone(), dev));
        tokio::time::sleep(self.delay).await;

        let mut data = HookData::new();
        data.insert("Title".into(), "from executor".into());
        Ok(data)
    }
}

#[tokio::test]
async fn test_custom_executor_gets_params_and_dev_flag() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/posts/_id/index.html", "{{ Title }}");
    write(tmp.path(), "routes/posts/_id/index.server.json", "");

    let hooks = Arc::new(Recording {
        seen: Mutex::new(Vec::new()),
        delay: Duration::ZERO,
    });

    struct Shared(Arc<Recording>);

    #[async_trait]
    impl HookExecutor for Shared {
        async fn execute(&self, hook: &Path, params: &Params, dev: bool) -> Result<HookData, HookError> {
            self.0.execute(hook, params, dev).await
        }
    }

    let engine = Engine::builder(Config::for_site(tmp.path()))
        .runtime(RuntimeContext::new(Environment::Dev))
        .hooks(Shared(hooks.clone()))
        .build();

    assert_eq!(body(engine.handle("/posts/42", false).await), "from executor");

    let seen = hooks.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.get("id").map(String::as_str), Some("42"));
    assert!(seen[0].1);
}

#[tokio::test]
async fn test_slow_hook_times_out() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "{{ Title }}");
    write(tmp.path(), "routes/index.server.json", "");

    let mut config = Config::for_site(tmp.path());
    config.hooks.timeout_ms = 50;

    let engine = Engine::builder(config)
        .runtime(RuntimeContext::new(Environment::Prod))
        .hooks(Recording {
            seen: Mutex::new(Vec::new()),
            delay: Duration::from_secs(30),
        })
        .build();

    let Outcome::ServerError(message) = engine.handle("/", false).await else {
        panic!("expected server error");
    };
    assert!(message.contains("timed out"), "{}", message);
}

#[tokio::test]
async fn test_helpers_are_available() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "{{ env() }} {{ is_dev() }} {{ version() }}");

    let helpers = TemplateHelpers::new(Environment::Prod, tmp.path().join("out"))
        .with_function("version", |_: &std::collections::HashMap<String, tera::Value>| {
            Ok(tera::Value::from("1.2.3"))
        });

    let engine = Engine::builder(Config::for_site(tmp.path()))
        .runtime(RuntimeContext::new(Environment::Prod))
        .helpers(helpers)
        .build();

    assert_eq!(body(engine.handle("/", false).await), "prod false 1.2.3");
}

#[tokio::test]
async fn test_repeated_requests_are_identical_and_cached() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/blog/_slug/index.html", "<h1>{{ params.slug }}</h1>");

    let engine = engine(cached_config(tmp.path()), Environment::Prod);

    let first = page(engine.handle("/blog/hello/", false).await);
    assert_eq!(first.cache, CacheStatus::Miss);
    assert!(tmp.path().join("out/blog/hello/index.html").is_file());

    let second = page(engine.handle("blog/hello", false).await);
    assert_eq!(second.cache, CacheStatus::Hit);
    assert_eq!(first.body, second.body);
    assert_eq!(engine.renderer().cache_write_failures(), 0);
}

#[tokio::test]
async fn test_root_is_cached_under_output_dir() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "home");

    let engine = engine(cached_config(tmp.path()), Environment::Prod);
    page(engine.handle("/", false).await);

    assert_eq!(fs::read_to_string(tmp.path().join("out/index.html")).unwrap(), "home");
    assert_eq!(page(engine.handle("/", false).await).cache, CacheStatus::Hit);
}

#[tokio::test]
async fn test_precompressed_variant_in_prod() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/docs/index.html", "<p>docs</p>");

    let mut config = cached_config(tmp.path());
    config.cache.precompress = true;
    let engine = engine(config, Environment::Prod);

    let fresh = page(engine.handle("/docs", true).await);
    assert_eq!(fresh.cache, CacheStatus::Miss);
    assert_eq!(fresh.encoding, Encoding::Identity);
    assert!(tmp.path().join("out/docs/index.html.gz").is_file());

    let gz = page(engine.handle("/docs", true).await);
    assert_eq!(gz.cache, CacheStatus::Hit);
    assert_eq!(gz.encoding, Encoding::Gzip);
    assert_eq!(gunzip(&gz.body).unwrap(), b"<p>docs</p>");

    let plain = page(engine.handle("/docs", false).await);
    assert_eq!(plain.encoding, Encoding::Identity);
    assert_eq!(plain.body, b"<p>docs</p>");
}

#[tokio::test]
async fn test_externally_produced_gzip_is_served_without_precompress() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "home");

    let engine = engine(cached_config(tmp.path()), Environment::Prod);
    page(engine.handle("/", true).await);
    assert!(!tmp.path().join("out/index.html.gz").exists());

    let packed = strata::cache::compress::gzip(b"home", 6).unwrap();
    fs::write(tmp.path().join("out/index.html.gz"), packed).unwrap();

    let hit = page(engine.handle("/", true).await);
    assert_eq!(hit.encoding, Encoding::Gzip);
}

#[tokio::test]
async fn test_dev_never_serves_gzip() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "<body></body>");

    let mut config = cached_config(tmp.path());
    config.cache.precompress = true;
    let engine = engine(config, Environment::Dev);

    page(engine.handle("/", true).await);
    assert!(!tmp.path().join("out/index.html.gz").exists());

    let hit = page(engine.handle("/", true).await);
    assert_eq!(hit.cache, CacheStatus::Hit);
    assert_eq!(hit.encoding, Encoding::Identity);
}

#[tokio::test]
async fn test_cache_write_failure_is_counted_not_returned() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "home");
    // A file where the output directory should be
    fs::write(tmp.path().join("out"), "not a directory").unwrap();

    let engine = engine(cached_config(tmp.path()), Environment::Prod);

    assert_eq!(body(engine.handle("/", false).await), "home");
    assert_eq!(engine.renderer().cache_write_failures(), 1);
}

#[tokio::test]
async fn test_reload_script_only_in_dev() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "<html><body><p>hi</p></body></html>");

    let dev = body(engine(Config::for_site(tmp.path()), Environment::Dev).handle("/", false).await);
    let script = dev.find("/__strata_reload").expect("reload script");
    let close = dev.find("</body>").unwrap();
    assert!(script < close);
    assert!(dev.starts_with("<html><body><p>hi</p><script>"));
    assert!(dev.ends_with("</script></body></html>"));

    let prod = body(engine(Config::for_site(tmp.path()), Environment::Prod).handle("/", false).await);
    assert_eq!(prod, "<html><body><p>hi</p></body></html>");
}

#[tokio::test]
async fn test_shared_cache_keeps_reload_script_dev_only() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/index.html", "<html><body>hi</body></html>");
    write(tmp.path(), "routes/about/index.html", "<html><body>about</body></html>");

    // Dev writes the entry, prod serves it
    let dev = engine(cached_config(tmp.path()), Environment::Dev);
    let fresh = page(dev.handle("/", false).await);
    assert_eq!(fresh.cache, CacheStatus::Miss);
    assert!(String::from_utf8(fresh.body).unwrap().contains("/__strata_reload"));

    let stored = fs::read_to_string(tmp.path().join("out/index.html")).unwrap();
    assert_eq!(stored, "<html><body>hi</body></html>");

    let prod = engine(cached_config(tmp.path()), Environment::Prod);
    let hit = page(prod.handle("/", false).await);
    assert_eq!(hit.cache, CacheStatus::Hit);
    assert_eq!(String::from_utf8(hit.body).unwrap(), "<html><body>hi</body></html>");

    // Prod writes the entry, dev serves it
    let fresh = page(prod.handle("/about", false).await);
    assert_eq!(fresh.cache, CacheStatus::Miss);

    let hit = page(dev.handle("/about", false).await);
    assert_eq!(hit.cache, CacheStatus::Hit);
    let html = String::from_utf8(hit.body).unwrap();
    assert!(html.starts_with("<html><body>about<script>"));
    assert!(html.ends_with("</script></body></html>"));
}

#[tokio::test]
async fn test_layout_declaration_is_not_served() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "components/layouts/blog.html", r#"<body>{% include "page" %}</body>"#);
    write(
        tmp.path(),
        "routes/post/index.html",
        "<!-- layout: components/layouts/blog.html -->\n<p>x</p>",
    );

    let engine = prod(tmp.path());
    assert_eq!(body(engine.handle("/post", false).await), "<body><p>x</p></body>");
}

#[tokio::test]
async fn test_undefined_variable_in_layout_is_server_error() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "components/layouts/layout.html",
        r#"<title>{{ Title }}</title>{% include "page" %}"#,
    );
    write(tmp.path(), "routes/index.html", "<p>no hook</p>");

    let engine = prod(tmp.path());
    match engine.handle("/", false).await {
        Outcome::ServerError(message) => {
            assert!(message.starts_with("template execution error"), "{}", message);
            assert!(message.contains("Title"), "{}", message);
        }
        other => panic!("expected a server error, got {:?}", other),
    }

    write(
        tmp.path(),
        "components/layouts/layout.html",
        r#"<title>{{ Title | default(value="Site") }}</title>{% include "page" %}"#,
    );
    assert_eq!(
        body(engine.handle("/", false).await),
        "<title>Site</title><p>no hook</p>"
    );
}

#[tokio::test]
async fn test_literal_route_beats_parameter() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "routes/users/_id/index.html", "user {{ params.id }}");
    write(tmp.path(), "routes/users/new/index.html", "new user form");

    let engine = prod(tmp.path());
    assert_eq!(body(engine.handle("/users/new", false).await), "new user form");
    assert_eq!(body(engine.handle("/users/7", false).await), "user 7");
    assert_eq!(engine.handle("/users/7/edit", false).await.status(), StatusCode::NOT_FOUND);
}
