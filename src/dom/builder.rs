// ============================================================================
// ELEMENT BUILDER - Builder pattern para crear elementos fácilmente
// ============================================================================

use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::dom::{append_child, create_element, set_attribute, set_text_content};
use crate::utils::i18n::{t, Language};

pub struct ElementBuilder {
    element: Element,
}

impl ElementBuilder {
    /// Crear nuevo builder para un elemento
    pub fn new(tag: &str) -> Result<Self, JsValue> {
        Ok(Self {
            element: create_element(tag)?,
        })
    }

    /// Establecer class name (reemplaza todas las clases)
    pub fn class(self, class: &str) -> Self {
        self.element.set_class_name(class);
        self
    }

    /// Establecer ID
    pub fn id(self, id: &str) -> Result<Self, JsValue> {
        set_attribute(&self.element, "id", id)?;
        Ok(self)
    }

    /// Establecer text content
    pub fn text(self, text: &str) -> Self {
        set_text_content(&self.element, text);
        self
    }

    /// Texto traducido que se re-aplica al cambiar de idioma (`data-zh` / `data-en`)
    pub fn i18n(self, key: &str, lang: Language) -> Result<Self, JsValue> {
        set_attribute(&self.element, "data-zh", &t(key, Language::Chinese))?;
        set_attribute(&self.element, "data-en", &t(key, Language::English))?;
        set_text_content(&self.element, &t(key, lang));
        Ok(self)
    }

    /// Placeholder traducido (`data-placeholder-zh` / `data-placeholder-en`)
    pub fn placeholder(self, key: &str, lang: Language) -> Result<Self, JsValue> {
        set_attribute(&self.element, "data-placeholder-zh", &t(key, Language::Chinese))?;
        set_attribute(&self.element, "data-placeholder-en", &t(key, Language::English))?;
        set_attribute(&self.element, "placeholder", &t(key, lang))?;
        Ok(self)
    }

    /// Agregar hijo
    pub fn child(self, child: Element) -> Result<Self, JsValue> {
        append_child(&self.element, &child)?;
        Ok(self)
    }

    /// Establecer atributo
    pub fn attr(self, name: &str, value: &str) -> Result<Self, JsValue> {
        set_attribute(&self.element, name, value)?;
        Ok(self)
    }

    /// Construir y retornar elemento
    pub fn build(self) -> Element {
        self.element
    }
}
