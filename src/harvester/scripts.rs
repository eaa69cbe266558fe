use serde::Serialize;

use crate::harvester::selectors::SelectorConfig;

/// Resolves a selector against a scope, CSS or XPath by its leading character.
const FIND_HELPER: &str = r#"
    const __find = (scope, sel) => {
        const s = sel.trim();
        try {
            if (s.startsWith('/') || s.startsWith('./') || s.startsWith('(')) {
                const snap = document.evaluate(s, scope, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                const out = [];
                for (let i = 0; i < snap.snapshotLength; i++) out.push(snap.snapshotItem(i));
                return out;
            }
            return Array.from(scope.querySelectorAll(s));
        } catch (e) {
            return [];
        }
    };
    const __visible = (el) => !!el && !el.disabled && el.getClientRects().length > 0;
"#;

fn js_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Builds the JavaScript run inside the page for each browser-side step
pub struct PageScripts {
    selectors: SelectorConfig,
}

impl PageScripts {
    pub fn new(selectors: SelectorConfig) -> Self {
        Self { selectors }
    }

    /// Index of the first selector in `chain` with at least one match, or -1
    pub fn presence_script(&self, chain: &[String]) -> String {
        let chain = js_literal(chain);
        format!(
            r#"
            (() => {{
                {FIND_HELPER}
                const chain = {chain};
                for (let i = 0; i < chain.length; i++) {{
                    if (__find(document, chain[i]).length > 0) return i;
                }}
                return -1;
            }})()
            "#
        )
    }

    /// Click the first visible, enabled match of `selector`; true on success
    pub fn click_script(&self, selector: &str) -> String {
        let selector = js_literal(selector);
        format!(
            r#"
            (() => {{
                {FIND_HELPER}
                const el = __find(document, {selector}).find(__visible);
                if (!el) return false;
                el.scrollIntoView({{ block: 'center' }});
                el.click();
                return true;
            }})()
            "#
        )
    }

    /// Scroll the first matching region to its bottom; true if a region was found
    pub fn scroll_script(&self) -> String {
        let chain = js_literal(&self.selectors.scroll_region);
        format!(
            r#"
            (() => {{
                {FIND_HELPER}
                for (const sel of {chain}) {{
                    const region = __find(document, sel)[0];
                    if (region) {{
                        region.scrollTop = region.scrollHeight;
                        return true;
                    }}
                }}
                return false;
            }})()
            "#
        )
    }

    /// Rendered cards whose review id is not in `seen`, as `pending`
    fn pending_cards(&self, seen_ids: &[String]) -> String {
        let cards = js_literal(&self.selectors.cards);
        let id_attr = js_literal(&self.selectors.review_id_attribute);
        let seen = js_literal(seen_ids);
        format!(
            r#"
                let cards = [];
                for (const sel of {cards}) {{
                    cards = __find(document, sel);
                    if (cards.length > 0) break;
                }}
                const seen = new Set({seen});
                const idOf = (card) => card.getAttribute({id_attr}) || '';
                const pending = cards.filter(card => {{
                    const id = idOf(card);
                    return !(id && seen.has(id));
                }});
                const expandControl = (card) => {{
                    for (const sel of {expand}) {{
                        const more = __find(card, sel).find(__visible);
                        if (more) return more;
                    }}
                    return null;
                }};
            "#,
            expand = js_literal(&self.selectors.expand),
        )
    }

    /// Press the in-card "more" control of up to `limit` unseen cards;
    /// returns how many were pressed
    pub fn expand_script(&self, seen_ids: &[String], limit: usize) -> String {
        let pending = self.pending_cards(seen_ids);
        format!(
            r#"
            (() => {{
                {FIND_HELPER}
                {pending}
                let pressed = 0;
                for (const card of pending) {{
                    if (pressed >= {limit}) break;
                    const more = expandControl(card);
                    if (!more) continue;
                    try {{ more.click(); pressed++; }} catch (e) {{}}
                }}
                return pressed;
            }})()
            "#
        )
    }

    /// Read every rendered card whose review id is not in `seen_ids`
    ///
    /// This JS runs in the browser context and:
    /// 1. Picks the first card selector that matches anything
    /// 2. Reads each field through its rule chain, empty string when nothing matches
    /// 3. Flags cards that still show a "more" control as truncated
    pub fn collect_script(&self, seen_ids: &[String]) -> String {
        let s = &self.selectors;
        let pending = self.pending_cards(seen_ids);
        let author = js_literal(&s.author);
        let body = js_literal(&s.body);
        let tags = js_literal(&s.tags);
        let rating = js_literal(&s.rating);
        let date = js_literal(&s.date);

        format!(
            r#"
            (() => {{
                {FIND_HELPER}
                const readValue = (el, rule) => {{
                    if (rule.attribute) return el.getAttribute(rule.attribute) || '';
                    return (el.innerText || el.textContent || '');
                }};
                const readField = (card, rules) => {{
                    for (const rule of rules) {{
                        const els = __find(card, rule.selector);
                        if (els.length === 0) continue;
                        const values = (rule.join ? els : [els[0]])
                            .map(el => readValue(el, rule).trim())
                            .filter(v => v.length > 0);
                        if (values.length > 0) return values.join(' ');
                    }}
                    return '';
                }};
                {pending}
                return pending.map(card => ({{
                    reviewId: idOf(card),
                    author: readField(card, {author}),
                    body: readField(card, {body}),
                    tags: readField(card, {tags}),
                    rating: readField(card, {rating}),
                    date: readField(card, {date}),
                    truncated: expandControl(card) !== null,
                }}));
            }})()
            "#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripts() -> PageScripts {
        PageScripts::new(SelectorConfig::default())
    }

    #[test]
    fn test_collect_script_embeds_chains() {
        let script = scripts().collect_script(&[]);
        assert!(script.contains("div.jftiEf"));
        assert!(script.contains("\"data-review-id\""));
        assert!(script.contains("\"attribute\":\"aria-label\""));
        assert!(script.contains("new Set([])"));
        assert!(script.contains("truncated: expandControl(card) !== null"));
        // Reading never presses anything.
        assert!(!script.contains(".click()"));
    }

    #[test]
    fn test_expand_script_caps_presses() {
        let script = scripts().expand_script(&[], 5);
        assert!(script.contains("if (pressed >= 5) break;"));
        assert!(script.contains("more.click()"));
        assert!(script.contains("return pressed;"));
    }

    #[test]
    fn test_collect_script_escapes_seen_ids() {
        let seen = vec!["a'b".to_string(), "c\"d".to_string()];
        let script = scripts().collect_script(&seen);
        assert!(script.contains(r#"new Set(["a'b","c\"d"])"#));
    }

    #[test]
    fn test_click_script_quotes_xpath() {
        let script = scripts().click_script("//*[contains(text(),'전체 리뷰')]");
        assert!(script.contains(r#"__find(document, "//*[contains(text(),'전체 리뷰')]")"#));
    }

    #[test]
    fn test_presence_script_lists_chain() {
        let chain = vec!["#searchboxinput".to_string()];
        let script = scripts().presence_script(&chain);
        assert!(script.contains(r##"const chain = ["#searchboxinput"];"##));
    }

    #[test]
    fn test_scroll_script_uses_region_chain() {
        let script = scripts().scroll_script();
        assert!(script.contains("div.m6QErb.DxyBCb.kA9KIf.dS8AEf"));
        assert!(script.contains("scrollTop = region.scrollHeight"));
    }
}
