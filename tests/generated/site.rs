// @generated by rtml. Do not edit by hand.

/// Renders the `card` template.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn card(heading: &str) -> ::std::string::String {
    card_tree(heading).render()
}

/// Builds the `card` template as a tree, for includes and extends.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn card_tree(heading: &str) -> ::rtml::runtime::Tree {
    let mut __out = ::rtml::runtime::TreeBuilder::new();
    __out.text("<section><h2>");
    __out.value(&(heading));
    __out.text("</h2>");
    __out.slot_with_defaults_start("default");
        __out.text("<p>empty</p>");
    __out.slot_with_defaults_end("default");
    __out.text("</section>");
    __out.finish()
}

/// Renders the `choice` template.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn choice(flag: bool) -> ::std::string::String {
    choice_tree(flag).render()
}

/// Builds the `choice` template as a tree, for includes and extends.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn choice_tree(flag: bool) -> ::rtml::runtime::Tree {
    let mut __out = ::rtml::runtime::TreeBuilder::new();
    let mut __taken_0 = false;
    if flag {
        __taken_0 = true;
        __out.text("A");
    }
    if !__taken_0 {
        __out.text("B");
    }
    __out.finish()
}

/// Renders the `hello` template.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn hello() -> ::std::string::String {
    hello_tree().render()
}

/// Builds the `hello` template as a tree, for includes and extends.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn hello_tree() -> ::rtml::runtime::Tree {
    let mut __out = ::rtml::runtime::TreeBuilder::new();
    __out.extend(self::layouts::mid_tree());
    __out.text("Hello");
    __out.finish()
}

/// Renders the `list` template.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn list(items: &[&str]) -> ::std::string::String {
    list_tree(items).render()
}

/// Builds the `list` template as a tree, for includes and extends.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn list_tree(items: &[&str]) -> ::rtml::runtime::Tree {
    let mut __out = ::rtml::runtime::TreeBuilder::new();
    __out.text("<ul>");
    let mut __taken_0 = false;
    for (index, item) in (items).into_iter().enumerate() {
        __taken_0 = true;
        __out.text("<li>");
        __out.value(&(item));
        __out.text("</li>");
    }
    if !__taken_0 {
        __out.text("<li>none</li>");
    }
    __out.text("</ul>");
    __out.finish()
}

/// Renders the `ordered` template.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn ordered() -> ::std::string::String {
    ordered_tree().render()
}

/// Builds the `ordered` template as a tree, for includes and extends.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn ordered_tree() -> ::rtml::runtime::Tree {
    let mut __out = ::rtml::runtime::TreeBuilder::new();
    __out.extend(self::layouts::base_tree());
    __out.text("first");
    __out.select_slot("default", false);
        __out.text("<p>second</p>");
    __out.clear();
    __out.text("third");
    __out.finish()
}

/// Renders the `plain` template.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn plain() -> ::std::string::String {
    plain_tree().render()
}

/// Builds the `plain` template as a tree, for includes and extends.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn plain_tree() -> ::rtml::runtime::Tree {
    let mut __out = ::rtml::runtime::TreeBuilder::new();
    __out.text(concat!(
        "<ul class=\"nav\">\n",
        "  <li>\"a\" & 'b'</li>\n",
        "</ul>\n",
    ));
    __out.finish()
}

/// Renders the `summary` template.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn summary() -> ::std::string::String {
    summary_tree().render()
}

/// Builds the `summary` template as a tree, for includes and extends.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn summary_tree() -> ::rtml::runtime::Tree {
    let mut __out = ::rtml::runtime::TreeBuilder::new();
    __out.include_with_defaults_start(self::card_tree(("Summary")));
        __out.text("<p>a & b</p>");
    __out.include_with_defaults_end();
    __out.include(self::card_tree(("Empty")));
    __out.finish()
}

/// Renders the `unclosed` template.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn unclosed() -> ::std::string::String {
    unclosed_tree().render()
}

/// Builds the `unclosed` template as a tree, for includes and extends.
#[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
pub fn unclosed_tree() -> ::rtml::runtime::Tree {
    let mut __out = ::rtml::runtime::TreeBuilder::new();
    __out.text("<div><span>text</div>");
    __out.finish()
}

pub mod layouts {
    /// Renders the `layouts/base` template.
    #[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
    pub fn base() -> ::std::string::String {
        base_tree().render()
    }

    /// Builds the `layouts/base` template as a tree, for includes and extends.
    #[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
    pub fn base_tree() -> ::rtml::runtime::Tree {
        let mut __out = ::rtml::runtime::TreeBuilder::new();
        __out.text("<main>");
        __out.slot("default");
        __out.text("</main>");
        __out.finish()
    }

    /// Renders the `layouts/mid` template.
    #[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
    pub fn mid() -> ::std::string::String {
        mid_tree().render()
    }

    /// Builds the `layouts/mid` template as a tree, for includes and extends.
    #[allow(unused_variables, unused_mut, unused_parens, unused_braces, clippy::all, reason = "generated template code")]
    pub fn mid_tree() -> ::rtml::runtime::Tree {
        let mut __out = ::rtml::runtime::TreeBuilder::new();
        __out.extend(super::layouts::base_tree());
        __out.text("<section>");
        __out.slot("default");
        __out.text("</section>");
        __out.finish()
    }
}
