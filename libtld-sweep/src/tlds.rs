use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;

const IANA_TLD_LIST_URL: &str = "https://data.iana.org/TLD/tlds-alpha-by-domain.txt";

#[derive(Debug, Error)]
pub enum TldError {
    #[error("Failed to read TLD file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to fetch TLD list: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// One TLD per line. Surrounding whitespace is trimmed and blank lines are
/// skipped; everything else is taken as-is.
pub fn parse_tlds(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_tlds(path: impl AsRef<Path>) -> Result<Vec<String>, TldError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| TldError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_tlds(&text))
}

pub async fn fetch_iana_tlds(client: &Client) -> Result<Vec<String>, TldError> {
    fetch_tld_list(client, IANA_TLD_LIST_URL).await
}

/// Download a list in the IANA format: a `#` version header, then one
/// upper-case TLD per line. Punycode TLDs are left out.
pub async fn fetch_tld_list(client: &Client, url: &str) -> Result<Vec<String>, TldError> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    Ok(parse_tlds(&body)
        .into_iter()
        .filter(|line| !line.starts_with('#'))
        .map(|tld| tld.to_ascii_lowercase())
        .filter(|tld| !tld.starts_with("xn--"))
        .collect())
}

/// `<name>.<tld>` for every TLD, in list order.
pub fn expand_tlds<'a>(name: &'a str, tlds: &'a [String]) -> impl Iterator<Item = String> + 'a {
    tlds.iter().map(move |tld| [name, tld.as_str()].join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn expands_in_list_order() {
        let tlds = parse_tlds("com\nnet\norg\n");
        let domains: Vec<_> = expand_tlds("example", &tlds).collect();
        assert_eq!(domains, ["example.com", "example.net", "example.org"]);
    }

    #[test]
    fn trims_and_skips_blank_lines() {
        let tlds = parse_tlds("  com  \n\n\t\nco.uk\r\n  io");
        assert_eq!(tlds, ["com", "co.uk", "io"]);
    }

    #[test]
    fn local_lists_keep_every_non_blank_line() {
        let tlds = parse_tlds("com\n# not a comment\n");
        assert_eq!(tlds, ["com", "# not a comment"]);
    }

    #[test]
    fn keeps_duplicates_and_does_not_validate() {
        let tlds = parse_tlds("com\ncom\n-bad-");
        let domains: Vec<_> = expand_tlds("x", &tlds).collect();
        assert_eq!(domains, ["x.com", "x.com", "x.-bad-"]);
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "com\nnet\n\norg").unwrap();

        let tlds = read_tlds(file.path()).unwrap();
        assert_eq!(tlds, ["com", "net", "org"]);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = read_tlds("/definitely/not/here/tlds.txt").unwrap_err();
        assert!(matches!(err, TldError::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here/tlds.txt"));
    }

    #[tokio::test]
    async fn downloaded_list_drops_header_and_punycode() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/tlds.txt")
            .with_status(200)
            .with_body("# Version 2024101600, Last Updated Wed Oct 16 07:07:01 2024 UTC\nCOM\nNET\nXN--P1AI\nIO\n")
            .create_async()
            .await;

        let client = Client::new();
        let tlds = fetch_tld_list(&client, &format!("{}/tlds.txt", server.url())).await.unwrap();
        assert_eq!(tlds, ["com", "net", "io"]);
    }

    #[tokio::test]
    async fn download_error_status_is_a_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _list = server.mock("GET", "/tlds.txt").with_status(503).create_async().await;

        let client = Client::new();
        let err = fetch_tld_list(&client, &format!("{}/tlds.txt", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, TldError::Fetch(_)));
    }

    #[tokio::test]
    async fn stalled_download_gives_up_after_the_timeout() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/tlds.txt")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(std::time::Duration::from_secs(2));
                w.write_all(b"com\n")
            })
            .create_async()
            .await;

        let client = crate::http::create_list_client(std::time::Duration::from_millis(300), None).unwrap();
        let started = std::time::Instant::now();
        let err = fetch_tld_list(&client, &format!("{}/tlds.txt", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(&err, TldError::Fetch(e) if e.is_timeout()), "{}", err);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }
}
