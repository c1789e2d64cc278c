//! Document shell around the rendered application.

use crate::config::ModuleFormat;
use crate::payload::to_js_literal;
use crate::utils::html::render_attrs;

use super::RequestContext;

/// Id of the element the client hydrates.
pub const MOUNT_ID: &str = "_kiln";

/// Full HTML document for a rendered request.
///
/// The state literal escapes `<`, `>` and `/`, so it cannot close the
/// script element it is embedded in.
pub fn render_document(
    ctx: &RequestContext,
    markup: &str,
    client_entry: &str,
    format: ModuleFormat,
) -> String {
    let head = &ctx.head;
    let script_type = match format {
        ModuleFormat::Esm => " type=\"module\"",
        ModuleFormat::Cjs => "",
    };
    format!(
        concat!(
            "<!DOCTYPE html>",
            "<html{html_attrs}>",
            "<head>",
            "<meta charset=\"utf-8\">",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
            "{head}",
            "</head>",
            "<body{body_attrs}>",
            "<div id=\"{mount}\">{markup}</div>",
            "<script>window.__KILN_STATE__ = {state}</script>",
            "<script src=\"{src}\"{script_type}></script>",
            "</body>",
            "</html>"
        ),
        html_attrs = render_attrs(&head.html_attributes),
        head = head.to_markup(),
        body_attrs = render_attrs(&head.body_attributes),
        mount = MOUNT_ID,
        markup = markup,
        state = to_js_literal(&ctx.initial_state()),
        src = crate::utils::html::escape_attr(client_entry),
        script_type = script_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RequestPath;
    use crate::payload::Value;
    use crate::server::RouteData;

    #[test]
    fn test_document_shell() {
        let mut data = RouteData::new();
        data.insert("/".into(), Value::from("</script><script>alert(1)</script>"));
        let mut ctx = RequestContext::new(RequestPath::from("/"), data);
        ctx.head.set_title("Home");
        ctx.head.html_attributes.push(("lang".into(), "en".into()));

        let doc = render_document(&ctx, "<h1>Hi</h1>", "/_kiln/client-entry.js?t=5", ModuleFormat::Cjs);
        assert!(doc.starts_with("<!DOCTYPE html><html lang=\"en\"><head>"));
        assert!(doc.contains("<title>Home</title>"));
        assert!(doc.contains("<div id=\"_kiln\"><h1>Hi</h1></div>"));
        assert!(doc.contains("window.__KILN_STATE__ = {\"statusCode\":200"));
        assert!(!doc.contains("</script><script>alert"));
        assert!(doc.contains("<script src=\"/_kiln/client-entry.js?t=5\"></script>"));
    }

    #[test]
    fn test_esm_entry_is_module_script() {
        let ctx = RequestContext::new(RequestPath::from("/"), RouteData::new());
        let doc = render_document(&ctx, "", "/_kiln/client-entry.js?t=1", ModuleFormat::Esm);
        assert!(doc.contains("type=\"module\""));
    }
}
