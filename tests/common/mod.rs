use async_trait::async_trait;
use quinto_scout::error::FetchErrorKind;
use quinto_scout::scrapers::{RawResponse, Transport};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const LISTING: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Apartamento para alugar | QuintoAndar</title>
  <script type="application/ld+json">
    {"@type": "Apartment", "name": "Apartamento com 2 quartos no Tatuapé",
     "address": "Rua Exemplo, 123"}
  </script>
</head>
<body>
  <h1 data-testid="listing-title">Apartamento para alugar</h1>
  <div data-testid="address-container"><p>Rua Antiga, 999</p><p>Tatuapé, São Paulo</p></div>
  <div data-testid="house-main-info">
    <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>62 m²</p></div>
    <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>2 quartos (1 suíte)</p></div>
    <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>2 banheiros</p></div>
    <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>1 vaga</p></div>
    <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>8º andar</p></div>
    <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>Aceita pet</p></div>
    <div class="MainInfo_iconDescriptionWrapper__St8RA"><p>Metrô próximo</p></div>
  </div>
  <ul data-testid="listing-price-table">
    <li><span>Aluguel</span><div><p>R$1.500,00</p></div></li>
    <li><span>Condomínio</span><div><p>R$300,00</p></div></li>
    <li><span>Total</span><div><p>R$1.800,00</p></div></li>
  </ul>
</body>
</html>"#;

/// Serves queued responses per URL, then `fallback`; unknown URLs get 404.
pub struct QueuedTransport {
    fallback: HashMap<String, String>,
    queued: Mutex<HashMap<String, VecDeque<RawResponse>>>,
}

impl QueuedTransport {
    pub fn new() -> Self {
        Self {
            fallback: HashMap::new(),
            queued: Mutex::new(HashMap::new()),
        }
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.fallback.insert(url.to_string(), html.to_string());
        self
    }

    pub fn queue(self, url: &str, responses: Vec<RawResponse>) -> Self {
        self.queued
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
        self
    }
}

#[async_trait]
impl Transport for QueuedTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchErrorKind> {
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        if let Some(response) = queued {
            return Ok(response);
        }
        Ok(match self.fallback.get(url) {
            Some(html) => RawResponse::new(200, html.as_str()),
            None => RawResponse::new(404, "not found"),
        })
    }

    fn source_name(&self) -> &'static str {
        "queued"
    }
}
