use ct_core::types::{validate_declaration, validate_sheet, StyleDeclaration, StyleSheet};
use ct_core::{fingerprint_class_name, ConfigError};
use ct_css::{emit_global_rules, emit_rules, EmitOptions};
use indexmap::IndexSet;

/// 运行时规则注入器
///
/// 浏览器侧取类名时的落点：第一次访问某个声明就地取指纹、
/// 发射规则并记下来，之后同一类名不再重复产出。
/// 显式实例、显式生命周期——不是隐式单例，多个独立实例
/// （测试、多 bundle）互不串台。
pub struct RuleInjector {
    options: EmitOptions,
    salt: String,
    /// 已注入的类名
    injected: IndexSet<String>,
    /// 已注入的全部规则（按首次注入顺序，文本去重）
    rules: IndexSet<String>,
    /// 新产生、还没被宿主取走的规则
    pending: Vec<String>,
}

impl RuleInjector {
    /// 运行时侧默认用 "runtime" 作 salt
    pub fn new(options: EmitOptions) -> Self {
        Self::with_salt(options, "runtime")
    }

    pub fn with_salt(options: EmitOptions, salt: impl Into<String>) -> Self {
        Self {
            options,
            salt: salt.into(),
            injected: IndexSet::new(),
            rules: IndexSet::new(),
            pending: Vec::new(),
        }
    }

    /// 取一个声明的类名，首次访问时注入对应规则
    ///
    /// 书写错误（变量名不以 `--` 开头等）立刻报错。
    pub fn class_for(
        &mut self,
        key: &str,
        declaration: &StyleDeclaration,
    ) -> Result<String, ConfigError> {
        validate_declaration(key, declaration)?;
        let class = fingerprint_class_name(key, declaration, &self.salt);
        if self.injected.insert(class.clone()) {
            for rule in emit_rules(&class, declaration, &self.options) {
                if self.rules.insert(rule.clone()) {
                    self.pending.push(rule);
                }
            }
        }
        Ok(class)
    }

    /// 注入全局表（键是原始选择器）
    pub fn inject_global(&mut self, sheet: &StyleSheet) -> Result<(), ConfigError> {
        validate_sheet(sheet)?;
        for rule in emit_global_rules(sheet, &self.options) {
            if self.rules.insert(rule.clone()) {
                self.pending.push(rule);
            }
        }
        Ok(())
    }

    /// 取走上次调用以来新产生的规则（交给宿主写进 <style>）
    pub fn drain_pending(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }

    /// 到目前为止注入的完整样式文本
    pub fn css(&self) -> String {
        self.rules
            .iter()
            .cloned()
            .collect::<Vec<String>>()
            .join("\n")
    }
}
