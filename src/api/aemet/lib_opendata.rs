use log::debug;
use reqwest::{blocking::Client, header::CACHE_CONTROL};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::interval::window::WindowError;

pub const DEFAULT_BASE_URL: &str = "https://opendata.aemet.es/opendata/api";

/// Value of `estado` when the payload is ready to be retrieved.
pub const STATUS_OK: u16 = 200;

/// One record as returned by the API, keys in the order they were received.
pub type Row = Map<String, Value>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("AEMET refused the request, estado {estado}: {descripcion}")]
    Status { estado: u16, descripcion: String },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid json from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Prepare response has no '{0}' url")]
    MissingPointer(&'static str),

    #[error("Unexpected payload from {url}: {reason}")]
    UnexpectedShape { url: String, reason: String },

    #[error(transparent)]
    Window(#[from] WindowError),
}

impl FetchError {
    /// A refused prepare request ends the whole run, everything else only
    /// loses the data of the request that failed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Status { .. })
    }
}

/// Body of the first ("prepare") call of every OpenData endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrepareResponse {
    pub estado: u16,
    #[serde(default)]
    pub descripcion: String,
    pub datos: Option<String>,
    pub metadatos: Option<String>,
}

pub trait Transport {
    /// Issue a GET and return the body decoded as text.
    fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError>;
}

#[derive(Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .query(query)
            .send()
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;
        debug!("GET {} -> {}", url, response.status());
        // AEMET reports errors in the body, so don't bail on the http status.
        // The data files come as ISO-8859-15, `text()` decodes using the charset.
        response.text().map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })
    }
}

pub struct OpenDataClient<T: Transport> {
    transport: T,
    base_url: String,
    api_key: String,
}

impl<T: Transport> OpenDataClient<T> {
    pub fn new(transport: T, base_url: &str, api_key: &str) -> Self {
        OpenDataClient {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Call an endpoint relative to the base url.  Fails with
    /// [`FetchError::Status`] if the API doesn't answer with `estado == 200`.
    pub fn prepare(&self, path: &str) -> Result<PrepareResponse, FetchError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let body = self
            .transport
            .get_text(&url, &[("api_key", self.api_key.as_str())])?;
        let response: PrepareResponse = parse_json(&url, &body)?;
        if response.estado != STATUS_OK {
            return Err(FetchError::Status {
                estado: response.estado,
                descripcion: response.descripcion,
            });
        }
        debug!("Received: {:?}", response);
        Ok(response)
    }

    /// Follow one of the urls handed out by [`OpenDataClient::prepare`].
    pub fn retrieve<D: DeserializeOwned>(&self, url: &str) -> Result<D, FetchError> {
        let body = self.transport.get_text(url, &[])?;
        parse_json(url, &body)
    }

    /// Follow a pointer url that should hold a json array of objects.
    pub fn retrieve_rows(&self, url: &str) -> Result<Vec<Row>, FetchError> {
        let value: Value = self.retrieve(url)?;
        rows_from_value(url, value)
    }
}

pub fn parse_json<D: DeserializeOwned>(url: &str, body: &str) -> Result<D, FetchError> {
    serde_json::from_str(body).map_err(|source| FetchError::Json {
        url: url.to_string(),
        source,
    })
}

pub fn rows_from_value(url: &str, value: Value) -> Result<Vec<Row>, FetchError> {
    let xs = match value {
        Value::Array(xs) => xs,
        other => {
            return Err(FetchError::UnexpectedShape {
                url: url.to_string(),
                reason: format!("expected an array, got {}", kind(&other)),
            })
        }
    };
    xs.into_iter()
        .map(|x| match x {
            Value::Object(row) => Ok(row),
            other => Err(FetchError::UnexpectedShape {
                url: url.to_string(),
                reason: format!("expected an object, got {}", kind(&other)),
            }),
        })
        .collect()
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// An in-memory stand-in for the OpenData service.
#[cfg(test)]
pub(crate) mod fake {
    use std::{
        cell::RefCell,
        collections::{HashMap, HashSet},
    };

    use serde_json::json;

    use super::*;

    pub const DATA_HOST: &str = "https://fake.aemet/sh";

    #[derive(Default)]
    pub struct FakeAemet {
        /// Number of rows served for a window, keyed by its `fechaini`
        pub row_counts: HashMap<String, usize>,
        /// `fechaini` values whose prepare call answers with this estado
        pub refused: HashMap<String, u16>,
        /// `fechaini` values whose prepare call fails in transit
        pub broken: HashSet<String>,
        pub metadata_fields: usize,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeAemet {
        pub fn with_rows(mut self, fechaini: &str, n: usize) -> Self {
            self.row_counts.insert(fechaini.to_string(), n);
            self
        }

        pub fn refusing(mut self, fechaini: &str, estado: u16) -> Self {
            self.refused.insert(fechaini.to_string(), estado);
            self
        }

        pub fn broken(mut self, fechaini: &str) -> Self {
            self.broken.insert(fechaini.to_string());
            self
        }

        pub fn calls_containing(&self, pattern: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|url| url.contains(pattern))
                .count()
        }

        fn prepare(&self, fechaini: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
            assert!(query.iter().any(|(k, _)| *k == "api_key"));
            if self.broken.contains(fechaini) {
                return Err(FetchError::UnexpectedShape {
                    url: fechaini.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            if let Some(estado) = self.refused.get(fechaini) {
                return Ok(json!({
                    "descripcion": "No hay datos que satisfagan esos criterios",
                    "estado": estado,
                })
                .to_string());
            }
            Ok(json!({
                "descripcion": "exito",
                "estado": 200,
                "datos": format!("{DATA_HOST}/datos/{fechaini}"),
                "metadatos": format!("{DATA_HOST}/metadatos"),
            })
            .to_string())
        }

        fn data(&self, fechaini: &str) -> String {
            let n = self.row_counts.get(fechaini).copied().unwrap_or(0);
            let rows: Vec<Value> = (0..n)
                .map(|i| {
                    let mut row = json!({
                        "fecha": format!("{fechaini}#{i}"),
                        "indicativo": "3195",
                        "nombre": "MADRID, RETIRO",
                        "tmed": "12,3",
                    });
                    // missing fields are simply left out by the API
                    if i % 2 == 1 {
                        row["prec"] = json!("0,0");
                    }
                    row
                })
                .collect();
            Value::Array(rows).to_string()
        }

        fn metadata(&self) -> String {
            let campos: Vec<Value> = (0..self.metadata_fields)
                .map(|i| {
                    json!({
                        "id": format!("campo{i}"),
                        "descripcion": format!("campo numero {i}"),
                        "tipo_datos": "string",
                        "requerido": i == 0,
                    })
                })
                .collect();
            json!({
                "unidad_generadora": "Servicio del Banco Nacional de Datos Climatológicos",
                "descripcion": "Climatologías diarias",
                "copyright": "© AEMET",
                "notaLegal": "https://www.aemet.es/es/nota_legal",
                "campos": campos,
            })
            .to_string()
        }
    }

    impl Transport for FakeAemet {
        fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            if let Some(rest) = url.split("/fechaini/").nth(1) {
                let fechaini = rest.split('/').next().unwrap();
                return self.prepare(fechaini, query);
            }
            if let Some(fechaini) = url.strip_prefix(&format!("{DATA_HOST}/datos/")) {
                return Ok(self.data(fechaini));
            }
            if url == format!("{DATA_HOST}/metadatos") {
                return Ok(self.metadata());
            }
            Ok("<html>not found</html>".to_string())
        }
    }
}
