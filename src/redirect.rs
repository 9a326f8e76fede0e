use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Instruction for the caller's web layer to send the payer's browser
/// to the provider's hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectionForm {
    action: String,
    inputs: BTreeMap<String, String>,
    method: HttpMethod,
}

impl RedirectionForm {
    pub fn new(action: impl Into<String>, inputs: BTreeMap<String, String>, method: HttpMethod) -> Self {
        Self {
            action: action.into(),
            inputs,
            method,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn inputs(&self) -> &BTreeMap<String, String> {
        &self.inputs
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// `{action, inputs, method}` for API consumers that redirect client-side
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "action": self.action,
            "inputs": self.inputs,
            "method": self.method,
        })
    }

    /// Renders a minimal HTML page whose form submits itself on load.
    ///
    /// Browsers drop the action's query string when submitting a GET form,
    /// so for GET the query pairs are carried as hidden inputs instead.
    pub fn render(&self) -> String {
        let (action, inputs) = self.submission_parts();

        let mut fields = String::new();
        for (name, value) in &inputs {
            fields.push_str(&format!(
                "      <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape_html(name),
                escape_html(value)
            ));
        }

        format!(
            "<!DOCTYPE html>\n\
             <html>\n\
             <head><meta charset=\"utf-8\"><title>Redirecting...</title></head>\n\
             <body onload=\"document.forms[0].submit()\">\n\
             \x20 <form action=\"{action}\" method=\"{method}\">\n\
             {fields}\
             \x20   <noscript><button type=\"submit\">Continue to payment</button></noscript>\n\
             \x20 </form>\n\
             </body>\n\
             </html>\n",
            action = escape_html(&action),
            method = self.method,
            fields = fields,
        )
    }

    fn submission_parts(&self) -> (String, BTreeMap<String, String>) {
        if self.method != HttpMethod::Get {
            return (self.action.clone(), self.inputs.clone());
        }

        let mut url = match Url::parse(&self.action) {
            Ok(url) if url.query().is_some() => url,
            _ => return (self.action.clone(), self.inputs.clone()),
        };

        let mut inputs: BTreeMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        inputs.extend(self.inputs.clone());

        url.set_query(None);
        (url.to_string(), inputs)
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
