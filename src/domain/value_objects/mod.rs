//! Value Objects for the catalog

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Location of an image, either an uploaded blob's public URL or one typed by staff.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageUrl(String);

impl ImageUrl {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(ValueError::EmptyUrl); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl TryFrom<String> for ImageUrl {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<ImageUrl> for String {
    fn from(url: ImageUrl) -> Self { url.0 }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// URL-safe category handle derived from its display name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    /// "Bolsas Maternidade Luxo" -> "bolsas-maternidade-luxo", "Coleção Verão" -> "colecao-verao"
    pub fn from_name(name: &str) -> Result<Self, ValueError> {
        let folded: String = name.to_lowercase().chars().map(fold_accent)
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
            .collect();
        let mut slug = String::with_capacity(folded.len());
        for c in folded.trim().chars() {
            let c = if c.is_whitespace() { '-' } else { c };
            if c == '-' && slug.ends_with('-') { continue; }
            slug.push(c);
        }
        if slug.is_empty() { return Err(ValueError::EmptySlug); }
        Ok(Self(slug))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// WhatsApp click-to-chat link used for customer inquiries
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppLink(String);

/// What a generated inquiry message says about the product
#[derive(Clone, Debug, Default)]
pub struct InquiryContext<'a> {
    pub product_name: &'a str,
    pub category_name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub product_url: Option<&'a str>,
    pub image_url: Option<&'a str>,
}

impl WhatsAppLink {
    /// Accepts a staff-provided link as-is once it parses as an absolute URL.
    pub fn parse(value: &str) -> Result<Self, ValueError> {
        let value = value.trim();
        Url::parse(value).map_err(|_| ValueError::InvalidLink(value.to_string()))?;
        Ok(Self(value.to_string()))
    }

    /// Plain link to the store's number, no prefilled text.
    pub fn for_number(number: &str) -> Result<Self, ValueError> {
        let digits = digits_only(number)?;
        Ok(Self(format!("https://wa.me/{digits}")))
    }

    /// Link with a prefilled inquiry message describing the product.
    pub fn inquiry(number: &str, ctx: &InquiryContext<'_>) -> Result<Self, ValueError> {
        let digits = digits_only(number)?;
        let category = ctx.category_name.unwrap_or("Produto").to_lowercase();
        let mut message = format!("Olá! Tenho interesse nesta {category}:\n\n*{}*\n", ctx.product_name);
        if let Some(description) = ctx.description.filter(|d| !d.trim().is_empty()) {
            message.push_str(&format!("\nDescrição: {description}\n"));
        }
        if let Some(link) = ctx.product_url {
            message.push_str(&format!("\nLink do produto: {link}"));
        }
        if let Some(image) = ctx.image_url {
            message.push_str(&format!("\n\nImagem: {image}"));
        }
        message.push_str("\n\nGostaria de saber mais informações sobre disponibilidade, preço e formas de pagamento.");

        let mut url = Url::parse(&format!("https://wa.me/{digits}"))
            .map_err(|_| ValueError::InvalidNumber(number.to_string()))?;
        url.query_pairs_mut().append_pair("text", &message);
        Ok(Self(url.into()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for WhatsAppLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

fn digits_only(number: &str) -> Result<String, ValueError> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() { return Err(ValueError::InvalidNumber(number.to_string())); }
    Ok(digits)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("image URL is empty")]
    EmptyUrl,
    #[error("slug would be empty")]
    EmptySlug,
    #[error("invalid link: {0}")]
    InvalidLink(String),
    #[error("invalid phone number: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_trims() { assert_eq!(ImageUrl::new("  https://x/1.jpg ").unwrap().as_str(), "https://x/1.jpg"); }

    #[test]
    fn test_image_url_rejects_blank() { assert_eq!(ImageUrl::new("   "), Err(ValueError::EmptyUrl)); }

    #[test]
    fn test_slug() {
        assert_eq!(Slug::from_name("Coleção  Verão - Luxo!").unwrap().as_str(), "colecao-verao-luxo");
        assert_eq!(Slug::from_name("Mochilas Maternidade").unwrap().as_str(), "mochilas-maternidade");
        assert!(Slug::from_name("!!!").is_err());
    }

    #[test]
    fn test_whatsapp_inquiry() {
        let ctx = InquiryContext { product_name: "Bolsa Luna", category_name: Some("Bolsas"), ..Default::default() };
        let link = WhatsAppLink::inquiry("+55 (18) 99612-5628", &ctx).unwrap();
        assert!(link.as_str().starts_with("https://wa.me/5518996125628?text="));
        let parsed = Url::parse(link.as_str()).unwrap();
        let (_, text) = parsed.query_pairs().find(|(k, _)| k == "text").unwrap();
        assert!(text.contains("nesta bolsas"));
        assert!(text.contains("*Bolsa Luna*"));
    }

    #[test]
    fn test_whatsapp_rejects_empty_number() { assert!(WhatsAppLink::for_number("abc").is_err()); }

    #[test]
    fn test_store_contact_link() {
        assert_eq!(WhatsAppLink::for_number("+55 (18) 99612-5628").unwrap().as_str(), "https://wa.me/5518996125628");
    }
}
