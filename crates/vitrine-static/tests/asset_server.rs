use hyper::{Method, StatusCode};
use rstest::{fixture, rstest};
use std::time::Duration;
use tempfile::TempDir;
use vitrine_core::RootDir;
use vitrine_http::{Handler, Request};
use vitrine_static::AssetServer;

const ONE_DAY: Duration = Duration::from_secs(86_400);
const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 1, 2, 3];

struct Assets {
	_dir: TempDir,
	server: AssetServer,
}

#[fixture]
fn assets() -> Assets {
	let dir = TempDir::new().unwrap();
	std::fs::create_dir_all(dir.path().join("images/covers")).unwrap();
	std::fs::write(dir.path().join("images/logo.png"), PNG_BYTES).unwrap();
	std::fs::write(dir.path().join("images/covers/first issue.jpg"), b"jpeg").unwrap();
	std::fs::write(dir.path().join("secret.txt"), b"outside").unwrap();
	std::fs::create_dir_all(dir.path().join("images/.git")).unwrap();
	std::fs::write(dir.path().join("images/.env"), b"TOKEN=1").unwrap();
	std::fs::write(dir.path().join("images/.git/config"), b"[core]").unwrap();

	let root = RootDir::open(dir.path().join("images")).unwrap();
	Assets {
		_dir: dir,
		server: AssetServer::new(root, ONE_DAY),
	}
}

fn get(uri: &str) -> Request {
	Request::builder().uri(uri).build().unwrap()
}

#[rstest]
#[tokio::test]
async fn test_serves_file_bytes_with_headers(assets: Assets) {
	let response = assets.server.serve("logo.png", &get("/assets/logo.png")).await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(&response.body[..], PNG_BYTES);
	assert_eq!(response.headers["cache-control"], "public, max-age=86400");
	assert_eq!(response.headers["content-type"], "image/png");
	assert_eq!(response.headers["content-length"], PNG_BYTES.len().to_string());
	assert!(response.headers.contains_key("etag"));
	assert!(
		response.headers["last-modified"]
			.to_str()
			.unwrap()
			.ends_with(" GMT")
	);
}

#[rstest]
#[tokio::test]
async fn test_nested_path_with_decoded_space(assets: Assets) {
	let mut request = get("/assets/covers/first%20issue.jpg");
	request
		.path_params
		.insert("path".to_string(), "covers/first issue.jpg".to_string());

	let response = assets.server.handle(request).await.unwrap();

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(&response.body[..], b"jpeg");
	assert_eq!(response.headers["content-type"], "image/jpeg");
}

#[rstest]
#[case("missing.png")]
#[case("covers")]
#[case("../secret.txt")]
#[case("covers/../../secret.txt")]
#[case("")]
#[case(".env")]
#[case(".git/config")]
#[tokio::test]
async fn test_not_found_cases(assets: Assets, #[case] relative: &str) {
	let response = assets.server.serve(relative, &get("/assets/x")).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(&response.body[..], br#"{"error":"Not found"}"#);
	assert!(!response.headers.contains_key("cache-control"));
}

#[rstest]
#[tokio::test]
async fn test_if_none_match_returns_not_modified(assets: Assets) {
	let first = assets.server.serve("logo.png", &get("/assets/logo.png")).await;
	let etag = first.headers["etag"].to_str().unwrap().to_string();

	let request = Request::builder()
		.uri("/assets/logo.png")
		.header("If-None-Match", &etag)
		.build()
		.unwrap();
	let response = assets.server.serve("logo.png", &request).await;

	assert_eq!(response.status, StatusCode::NOT_MODIFIED);
	assert!(response.body.is_empty());
	assert_eq!(response.headers["etag"], etag.as_str());
	assert_eq!(response.headers["cache-control"], "public, max-age=86400");
}

#[rstest]
#[tokio::test]
async fn test_stale_etag_gets_full_response(assets: Assets) {
	let request = Request::builder()
		.uri("/assets/logo.png")
		.header("If-None-Match", "\"0-0\"")
		.build()
		.unwrap();

	let response = assets.server.serve("logo.png", &request).await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(&response.body[..], PNG_BYTES);
}

#[rstest]
#[tokio::test]
async fn test_head_has_headers_without_body(assets: Assets) {
	let request = Request::builder()
		.method(Method::HEAD)
		.uri("/assets/logo.png")
		.build()
		.unwrap();

	let response = assets.server.serve("logo.png", &request).await;

	assert_eq!(response.status, StatusCode::OK);
	assert!(response.body.is_empty());
	assert_eq!(response.headers["content-length"], PNG_BYTES.len().to_string());
}

#[cfg(unix)]
#[rstest]
#[tokio::test]
async fn test_symlink_out_of_root_is_not_found(assets: Assets) {
	let link = assets.server.root().join("escape.txt");
	std::os::unix::fs::symlink(assets.server.root().join("../secret.txt"), &link).unwrap();

	let response = assets.server.serve("escape.txt", &get("/assets/escape.txt")).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[rstest]
fn test_cache_control_follows_max_age() {
	let dir = TempDir::new().unwrap();
	let server = AssetServer::new(RootDir::open(dir.path()).unwrap(), Duration::from_secs(60));
	assert_eq!(server.cache_control(), "public, max-age=60");
}
