//! Markup producers. Hosts supply their own `ViewRenderer`; `TextRenderer` is
//! the bundled one used by the command-line host and the tests.

use crate::format::DisplayBill;

/// What the new-bill form shows besides the fields the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBillView {
    pub staged_file: Option<String>,
    pub validation_message: Option<String>,
    pub form_error: Option<String>,
}

pub trait ViewRenderer: Send + Sync {
    fn login_page(&self) -> String;
    fn loading_page(&self) -> String;
    fn error_page(&self, message: &str) -> String;
    fn bills_page(&self, bills: &[DisplayBill]) -> String;
    fn new_bill_page(&self, view: &NewBillView) -> String;
    fn receipt_modal(&self, bill_url: Option<&str>) -> String;
}

pub struct TextRenderer;

impl TextRenderer {
    fn row(bill: &DisplayBill) -> String {
        let url = bill
            .record
            .file_url
            .as_deref()
            .map(|url| format!(r#" data-bill-url="{}""#, escape(url)))
            .unwrap_or_default();
        format!(
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{} €</td><td>{}</td><td><div data-testid="icon-eye"{url}></div></td></tr>"#,
            escape(&bill.record.expense_type),
            escape(&bill.record.name),
            escape(&bill.display_date),
            bill.record.amount,
            bill.display_status,
        )
    }
}

impl ViewRenderer for TextRenderer {
    fn login_page(&self) -> String {
        r#"<div data-testid="login-page"><h2>Employé</h2><h2>Administration</h2></div>"#.to_string()
    }

    fn loading_page(&self) -> String {
        r#"<div id="loading">Loading...</div>"#.to_string()
    }

    fn error_page(&self, message: &str) -> String {
        format!(
            r#"<div id="error-page">Erreur<div data-testid="error-message">{}</div></div>"#,
            escape(message)
        )
    }

    fn bills_page(&self, bills: &[DisplayBill]) -> String {
        let rows: String = bills.iter().map(Self::row).collect();
        format!(
            r#"<div class="content"><div class="content-header"><div class="content-title">Mes notes de frais</div><button data-testid="btn-new-bill">Nouvelle note de frais</button></div><table><tbody data-testid="tbody">{rows}</tbody></table></div>"#
        )
    }

    fn new_bill_page(&self, view: &NewBillView) -> String {
        let staged = view
            .staged_file
            .as_deref()
            .map(|name| format!(r#" data-file-name="{}""#, escape(name)))
            .unwrap_or_default();
        let validation = view
            .validation_message
            .as_deref()
            .map(|msg| format!(r#"<span data-testid="file-error">{}</span>"#, escape(msg)))
            .unwrap_or_default();
        let error = view
            .form_error
            .as_deref()
            .map(|msg| format!(r#"<div data-testid="form-error">{}</div>"#, escape(msg)))
            .unwrap_or_default();
        format!(
            r#"<div class="content-title">Envoyer une note de frais</div><form data-testid="form-new-bill"><input data-testid="file" type="file"{staged}/>{validation}{error}<button id="btn-send-bill" type="submit">Envoyer</button></form>"#
        )
    }

    fn receipt_modal(&self, bill_url: Option<&str>) -> String {
        let image = bill_url
            .map(|url| format!(r#"<img src="{}" alt="Bill"/>"#, escape(url)))
            .unwrap_or_default();
        format!(
            r#"<div class="modal fade show" data-testid="modaleFile"><h5 class="modal-title">Justificatif</h5><div class="modal-body">{image}</div></div>"#
        )
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
