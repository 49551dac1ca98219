//! Talk to the Digital Ocean v2 API
//!
//! Just enough of the droplets endpoints to find a droplet by hostname
//! and enumerate the kernels it can boot. Responses arrive in pages
//! linked together by a `next` url; a fetch walks the chain and hands
//! back one flat list.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use reqwest;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json;

use kernels::Kernel;

static API_BASE: &'static str = "https://api.digitalocean.com/v2";

/// The API caps page size at 200; ask for the cap to keep round trips
/// down.
static PER_PAGE: u32 = 200;

/// A droplet as the API reports it.
///
/// `kernel` is the kernel the droplet is configured to boot. Droplets
/// that manage their own kernel report null here.
#[derive(Debug, Deserialize)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub kernel: Option<Kernel>,
}

/// Everything that can go wrong talking to the API.
#[derive(Debug, From)]
pub enum ApiError {
    Http(reqwest::Error),
    Json(serde_json::Error),
    #[from(ignore)]
    BadStatus(StatusCode, String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ApiError::Http(ref e) => write!(f, "{}", e),
            ApiError::Json(ref e) => write!(f, "the API returned unexpected json: {}", e),
            ApiError::BadStatus(ref status, ref url) => write!(f, "{} from {}", status, url),
        }
    }
}

/// One page of a paginated endpoint.
///
/// A page knows the url of its successor and nothing else about it.
trait Page: DeserializeOwned {
    type Item;

    fn next_url(&self) -> Option<String>;
    fn into_items(self) -> Vec<Self::Item>;
}

#[derive(Debug, Deserialize)]
struct DropletsPage {
    droplets: Vec<Droplet>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct KernelsPage {
    kernels: Vec<Kernel>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    pages: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    next: Option<String>,
}

impl Links {
    fn next_url(&self) -> Option<String> {
        self.pages.as_ref().and_then(|pages| pages.next.clone())
    }
}

impl Page for DropletsPage {
    type Item = Droplet;

    fn next_url(&self) -> Option<String> {
        self.links.next_url()
    }
    fn into_items(self) -> Vec<Droplet> {
        self.droplets
    }
}

impl Page for KernelsPage {
    type Item = Kernel;

    fn next_url(&self) -> Option<String> {
        self.links.next_url()
    }
    fn into_items(self) -> Vec<Kernel> {
        self.kernels
    }
}

pub struct DoClient {
    client: Client,
    key: String,
    verbose: u8,
}

impl DoClient {
    /// Build a client that bounds every call by `timeout` seconds.
    pub fn new(key: &str, timeout: u64, verbose: u8) -> Result<DoClient, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;
        Ok(DoClient {
            client: client,
            key: key.to_owned(),
            verbose: verbose,
        })
    }

    /// Every droplet on the account.
    pub fn droplets(&self) -> Result<Vec<Droplet>, ApiError> {
        let first = format!("{}/droplets?per_page={}", API_BASE, PER_PAGE);
        collect_pages(first, |url| self.get_page::<DropletsPage>(url))
    }

    /// Every kernel the droplet can boot.
    pub fn kernels(&self, droplet_id: u64) -> Result<Vec<Kernel>, ApiError> {
        let first = format!(
            "{}/droplets/{}/kernels?per_page={}",
            API_BASE, droplet_id, PER_PAGE
        );
        collect_pages(first, |url| self.get_page::<KernelsPage>(url))
    }

    fn get_page<P: Page>(&self, url: &str) -> Result<P, ApiError> {
        if self.verbose > 0 {
            println!("INFO: querying {}", url);
        }
        let resp = self.client.get(url).bearer_auth(&self.key).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if self.verbose > 2 {
            println!("INFO: response from {}:\n{}", url, body);
        }
        if !status.is_success() {
            return Err(ApiError::BadStatus(status, url.to_owned()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// The pages of a paginated endpoint, fetched as they are consumed.
///
/// A fetch error ends the iteration: the link to the failed page has
/// already been consumed, so the sequence cannot be restarted.
struct PageIter<P, F> {
    next: Option<String>,
    fetch: F,
    _page: PhantomData<P>,
}

impl<P, F> Iterator for PageIter<P, F>
where
    P: Page,
    F: FnMut(&str) -> Result<P, ApiError>,
{
    type Item = Result<P, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        let url = self.next.take()?;
        match (self.fetch)(&url) {
            Ok(page) => {
                self.next = page.next_url();
                Some(Ok(page))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Follow the page chain starting at `first`, accumulating items in the
/// order the API returns them. The first failed page aborts the whole
/// fetch.
fn collect_pages<P, F>(first: String, fetch: F) -> Result<Vec<P::Item>, ApiError>
where
    P: Page,
    F: FnMut(&str) -> Result<P, ApiError>,
{
    let pages = PageIter {
        next: Some(first),
        fetch: fetch,
        _page: PhantomData,
    };
    let mut items = Vec::new();
    for page in pages {
        items.extend(page?.into_items());
    }
    Ok(items)
}

#[cfg(test)]
mod test {
    use super::*;

    use serde_json;

    #[test]
    fn droplets_pages_deserialize() {
        let body = r#"{
            "droplets": [
                {
                    "id": 3164444,
                    "name": "web-1",
                    "status": "active",
                    "kernel": {
                        "id": 2233,
                        "name": "Ubuntu 14.04 x64 vmlinuz-3.13.0-37-generic",
                        "version": "3.13.0-37-generic"
                    }
                },
                {
                    "id": 3164445,
                    "name": "web-2",
                    "kernel": null
                }
            ],
            "links": {
                "pages": {
                    "next": "https://api.digitalocean.com/v2/droplets?page=2",
                    "last": "https://api.digitalocean.com/v2/droplets?page=3"
                }
            },
            "meta": {"total": 412}
        }"#;
        let page: DropletsPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.droplets.len(), 2);
        assert_eq!(page.droplets[0].name, "web-1");
        assert_eq!(page.droplets[0].kernel.as_ref().unwrap().id, 2233);
        assert!(page.droplets[1].kernel.is_none());
        assert_eq!(
            page.next_url().unwrap(),
            "https://api.digitalocean.com/v2/droplets?page=2"
        );
    }

    #[test]
    fn last_pages_have_no_next_url() {
        let no_pages: KernelsPage =
            serde_json::from_str(r#"{"kernels": [], "links": {}}"#).unwrap();
        assert!(no_pages.next_url().is_none());

        let no_links: KernelsPage = serde_json::from_str(r#"{"kernels": []}"#).unwrap();
        assert!(no_links.next_url().is_none());

        let no_next: KernelsPage = serde_json::from_str(
            r#"{"kernels": [], "links": {"pages": {"last": "https://example.com"}}}"#,
        ).unwrap();
        assert!(no_next.next_url().is_none());
    }

    fn canned(url: &str) -> Result<KernelsPage, ApiError> {
        let body = match url {
            "page-1" => {
                r#"{"kernels": [{"id": 1, "name": "a"}, {"id": 2, "name": "b"}],
                    "links": {"pages": {"next": "page-2"}}}"#
            }
            "page-2" => {
                r#"{"kernels": [{"id": 3, "name": "c"}],
                    "links": {"pages": {"next": "page-3"}}}"#
            }
            "page-3" => r#"{"kernels": [{"id": 4, "name": "d"}], "links": {}}"#,
            _ => panic!("unexpected url {}", url),
        };
        Ok(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn pagination_accumulates_pages_in_order() {
        let kernels = collect_pages::<KernelsPage, _>("page-1".to_owned(), canned).unwrap();
        let ids: Vec<u64> = kernels.iter().map(|k| k.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn a_failed_page_aborts_the_fetch() {
        let mut calls = 0;
        let result = collect_pages::<KernelsPage, _>("page-1".to_owned(), |url| {
            calls += 1;
            if url == "page-1" {
                canned(url)
            } else {
                Err(serde_json::from_str::<KernelsPage>("{").unwrap_err().into())
            }
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }
}
