use std::collections::HashMap;

/// In-memory representation of an ebook container.
/// Holds the metadata, reading order, and raw resources the conversion
/// pipeline consumes.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    pub spine: Vec<SpineItem>,
    pub resources: HashMap<String, Resource>,
}

/// Book metadata (Dublin Core subset)
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
}

/// An item in the reading order (spine)
#[derive(Debug, Clone)]
pub struct SpineItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

/// A resource (content document, image, CSS, font, etc.)
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the book
    pub fn add_resource(
        &mut self,
        href: impl Into<String>,
        data: Vec<u8>,
        media_type: impl Into<String>,
    ) {
        self.resources.insert(
            href.into(),
            Resource {
                data,
                media_type: media_type.into(),
            },
        );
    }

    /// Get a resource by href
    pub fn get_resource(&self, href: &str) -> Option<&Resource> {
        self.resources.get(href)
    }

    /// Add a spine item
    pub fn add_spine_item(
        &mut self,
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
    ) {
        self.spine.push(SpineItem {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
        });
    }

    /// Image resources in ascending href order, for deterministic output.
    pub fn images(&self) -> Vec<(&str, &Resource)> {
        let mut images: Vec<(&str, &Resource)> = self
            .resources
            .iter()
            .filter(|(_, r)| r.media_type.starts_with("image/"))
            .map(|(href, r)| (href.as_str(), r))
            .collect();
        images.sort_by_key(|(href, _)| *href);
        images
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}
