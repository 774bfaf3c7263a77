//! Data Forms (XEP-0004): the `jabber:x:data` payload used to shape the
//! in-band registration form. Only the subset the gateway needs — field
//! `var`/`type`/`label`/`value*` and the form-level `type`/`title`/
//! `instructions` — is modelled.

use icq_xml::Element;

/// The data forms namespace.
pub const NS_DATA_FORMS: &str = "jabber:x:data";

/// The `type` attribute of a `<x xmlns='jabber:x:data'/>` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormType {
    /// A form being presented to a user for filling in.
    Form,
    /// A filled-in form being submitted back.
    Submit,
    /// A cancellation of a multi-stage form.
    Cancel,
    /// A non-editable result, e.g. search results.
    Result_,
}

impl FormType {
    fn as_str(self) -> &'static str {
        match self {
            FormType::Form => "form",
            FormType::Submit => "submit",
            FormType::Cancel => "cancel",
            FormType::Result_ => "result",
        }
    }

    fn from_str(s: &str) -> Option<FormType> {
        match s {
            "form" => Some(FormType::Form),
            "submit" => Some(FormType::Submit),
            "cancel" => Some(FormType::Cancel),
            "result" => Some(FormType::Result_),
            _ => None,
        }
    }
}

/// A single `<field/>` of a data form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field {
    /// The field's unique identifier within the form.
    pub var: Option<String>,
    /// The field's type, e.g. `text-single`, `boolean`, `hidden`.
    pub type_: Option<String>,
    /// A human-readable label for the field.
    pub label: Option<String>,
    /// The field's value(s); a multi-value field carries more than one.
    pub values: Vec<String>,
}

impl Field {
    fn from_element(el: &Element) -> Field {
        let mut field = Field {
            var: el.attr("var").map(str::to_owned),
            type_: el.attr("type").map(str::to_owned),
            label: el.attr("label").map(str::to_owned),
            values: Vec::new(),
        };
        for child in el.children() {
            if child.name() == "value" {
                field.values.push(child.text());
            }
        }
        field
    }

    fn to_element(&self) -> Element {
        let mut builder = Element::builder("field", NS_DATA_FORMS);
        if let Some(var) = &self.var {
            builder = builder.attr("var", var.clone());
        }
        if let Some(type_) = &self.type_ {
            builder = builder.attr("type", type_.clone());
        }
        if let Some(label) = &self.label {
            builder = builder.attr("label", label.clone());
        }
        let mut el = builder.build();
        for value in &self.values {
            el.append_child(
                Element::builder("value", NS_DATA_FORMS)
                    .append_text(value.clone())
                    .build(),
            );
        }
        el
    }
}

/// An `<x xmlns='jabber:x:data'/>` form.
#[derive(Debug, Clone, PartialEq)]
pub struct DataForm {
    /// The form's purpose.
    pub type_: FormType,
    /// An optional title.
    pub title: Option<String>,
    /// Instructions, possibly more than one paragraph.
    pub instructions: Vec<String>,
    /// The form's fields, in document order.
    pub fields: Vec<Field>,
}

impl DataForm {
    /// Builds an empty form of the given type.
    pub fn new(type_: FormType) -> DataForm {
        DataForm { type_, title: None, instructions: Vec::new(), fields: Vec::new() }
    }

    /// Parses an `<x xmlns='jabber:x:data'/>` element.
    pub fn from_element(el: &Element) -> Option<DataForm> {
        if !el.is("x", NS_DATA_FORMS) {
            return None;
        }
        let type_ = FormType::from_str(el.attr("type")?)?;
        let mut form = DataForm::new(type_);
        for child in el.children() {
            match child.name() {
                "title" => form.title = Some(child.text()),
                "instructions" => form.instructions.push(child.text()),
                "field" => form.fields.push(Field::from_element(child)),
                _ => {}
            }
        }
        Some(form)
    }

    /// Renders this form as an `<x xmlns='jabber:x:data'/>` element.
    pub fn to_element(&self) -> Element {
        let mut el = Element::builder("x", NS_DATA_FORMS)
            .attr("type", self.type_.as_str())
            .build();
        if let Some(title) = &self.title {
            el.append_child(
                Element::builder("title", NS_DATA_FORMS)
                    .append_text(title.clone())
                    .build(),
            );
        }
        for instructions in &self.instructions {
            el.append_child(
                Element::builder("instructions", NS_DATA_FORMS)
                    .append_text(instructions.clone())
                    .build(),
            );
        }
        for field in &self.fields {
            el.append_child(field.to_element());
        }
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_title_and_fields() {
        let mut form = DataForm::new(FormType::Form);
        form.title = Some("Registration".into());
        form.instructions.push("Fill in your UIN and password.".into());
        form.fields.push(Field {
            var: Some("username".into()),
            type_: Some("text-single".into()),
            label: Some("UIN".into()),
            values: vec![],
        });
        let parsed = DataForm::from_element(&form.to_element()).unwrap();
        assert_eq!(parsed, form);
    }

    #[test]
    fn multi_value_field_keeps_every_value(){
        let mut el = Element::bare("field", NS_DATA_FORMS);
        el.append_child(Element::builder("value", NS_DATA_FORMS).append_text("a").build());
        el.append_child(Element::builder("value", NS_DATA_FORMS).append_text("b").build());
        let field = Field::from_element(&el);
        assert_eq!(field.values, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rejects_unknown_type_attribute() {
        let el = Element::builder("x", NS_DATA_FORMS).attr("type", "bogus").build();
        assert!(DataForm::from_element(&el).is_none());
    }
}
