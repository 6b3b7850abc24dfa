use ct_css::{ContainerAlias, EmitOptions};
use ct_parse::parse_configuration;
use ct_runtime::compile_config;
use pretty_assertions::assert_eq;

fn options() -> EmitOptions {
    let mut options = EmitOptions::default();
    options
        .breakpoints
        .insert("sm".to_string(), "25rem".to_string());
    options
        .breakpoints
        .insert("lg".to_string(), "64rem".to_string());
    options.containers.insert(
        "card".to_string(),
        ContainerAlias {
            name: Some("card".to_string()),
            rule: "width >= 20rem".to_string(),
        },
    );
    options
}

#[test]
fn test_end_to_end_parse_and_compile() {
    // 解析 → 编译 → 规则，一条龙
    let config = parse_configuration(
        r#"{
            base: {
                card: {
                    fontSize: "1.25rem",
                    ul: {
                        display: "flex",
                        "@media (width < 20rem)": { ul: { display: "grid" } },
                    },
                },
            },
        }"#,
    )
    .expect("configuration should parse");

    let output = compile_config(&config, "src/App.tsx", &options()).unwrap();
    let class = output.config.base.as_ref().unwrap()["card"].clone();

    assert_eq!(
        output.rules,
        vec![
            format!(".{}{{font-size:1.25rem}}", class),
            format!(".{} ul{{display:flex}}", class),
            format!("@media (width < 20rem){{.{} ul ul{{display:grid}}}}", class),
        ]
    );
}

#[test]
fn test_end_to_end_override_ordering() {
    let config = parse_configuration(
        r#"{
            base: {
                note: {
                    textAlign: "left",
                    "@sm": { textAlign: "justify" },
                },
            },
        }"#,
    )
    .unwrap();

    let output = compile_config(&config, "mod", &options()).unwrap();
    let class = output.config.base.as_ref().unwrap()["note"].clone();

    // 基础规则严格先于 @media 包裹的规则
    assert_eq!(
        output.rules,
        vec![
            format!(".{}{{text-align:left}}", class),
            format!("@media (width >= 25rem){{.{}{{text-align:justify}}}}", class),
        ]
    );
}

#[test]
fn test_end_to_end_variants_and_defaults() {
    let config = parse_configuration(
        r#"{
            base: { button: { padding: 8 } },
            variant: {
                tone: {
                    dark: { button: { background: "black", color: "white" } },
                    light: { button: { background: "white", color: "black" } },
                },
            },
            defaults: { tone: "dark" },
        }"#,
    )
    .unwrap();

    let output = compile_config(&config, "mod", &options()).unwrap();

    let base = output.config.base.as_ref().unwrap();
    let variant = output.config.variant.as_ref().unwrap();
    assert!(base["button"].starts_with("ct_"));
    assert!(variant["tone"]["dark"]["button"].starts_with("ct_"));
    assert_ne!(
        variant["tone"]["dark"]["button"],
        variant["tone"]["light"]["button"]
    );
    // base 1 条 + 两个变体各 1 条
    assert_eq!(output.rules.len(), 3);
}

#[test]
fn test_end_to_end_global_section() {
    let config = parse_configuration(
        r#"{
            global: {
                body: { margin: 0, fontFamily: "system-ui" },
                "h1, h2": { lineHeight: 1.2 },
            },
        }"#,
    )
    .unwrap();

    let output = compile_config(&config, "mod", &options()).unwrap();
    assert!(output.config.global);
    assert_eq!(
        output.rules,
        vec![
            "body{margin:0px;font-family:system-ui}".to_string(),
            "h1, h2{line-height:1.2}".to_string(),
        ]
    );
}

#[test]
fn test_compiled_literal_round_trips_as_json() {
    let config = parse_configuration(r#"{base: {card: {padding: 8}}}"#).unwrap();
    let output = compile_config(&config, "mod", &options()).unwrap();

    // 拼回源码的交换契约必须无损往返
    let literal = serde_json::to_string(&output.config).unwrap();
    let back: ct_core::CompiledConfig = serde_json::from_str(&literal).unwrap();
    assert_eq!(back, output.config);
}

#[test]
fn test_salt_keeps_same_keys_apart_across_modules() {
    let config = parse_configuration(r#"{base: {card: {padding: 8}}}"#).unwrap();
    let options = options();

    let one = compile_config(&config, "src/A.tsx", &options).unwrap();
    let two = compile_config(&config, "src/B.tsx", &options).unwrap();
    assert_ne!(
        one.config.base.as_ref().unwrap()["card"],
        two.config.base.as_ref().unwrap()["card"]
    );
}

#[test]
fn test_container_shorthand_end_to_end() {
    let config = parse_configuration(
        r#"{
            base: {
                panel: {
                    display: "block",
                    "@card": { display: "flex" },
                },
            },
        }"#,
    )
    .unwrap();

    let output = compile_config(&config, "mod", &options()).unwrap();
    let class = output.config.base.as_ref().unwrap()["panel"].clone();
    assert_eq!(
        output.rules[1],
        format!("@container card (width >= 20rem){{.{}{{display:flex}}}}", class)
    );
}
