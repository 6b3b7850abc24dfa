use ct_core::types::{StyleSheet, VariantSelection, VariantSheet};
use ct_core::{ConfigError, CtConfig};
use ct_css::EmitOptions;

use crate::compile::{compile_config, CompiledOutput};

/// 命令式构建器
///
/// 对应 `ct()` 调用形式的另一种书写方式：先 `new Ct()`，
/// 再逐段赋值 `base` / `global` / `variant` / `defaults`。
/// 显式的脏标记代替"可调用又可赋值的代理对象"：
/// 每个 setter 把缓存作废，`compile()` 只在需要时重算。
#[derive(Debug, Default)]
pub struct CtBuilder {
    config: CtConfig,
    salt: String,
    dirty: bool,
    cache: Option<CompiledOutput>,
}

impl CtBuilder {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            config: CtConfig::default(),
            salt: salt.into(),
            dirty: true,
            cache: None,
        }
    }

    pub fn global(&mut self, sheet: StyleSheet) -> &mut Self {
        self.config.global = Some(sheet);
        self.dirty = true;
        self
    }

    pub fn base(&mut self, sheet: StyleSheet) -> &mut Self {
        self.config.base = Some(sheet);
        self.dirty = true;
        self
    }

    pub fn variant(&mut self, variant: VariantSheet) -> &mut Self {
        self.config.variant = Some(variant);
        self.dirty = true;
        self
    }

    pub fn defaults(&mut self, defaults: VariantSelection) -> &mut Self {
        self.config.defaults = Some(defaults);
        self.dirty = true;
        self
    }

    pub fn config(&self) -> &CtConfig {
        &self.config
    }

    /// 编译当前配置；setter 之后第一次调用重算，其余命中缓存
    pub fn compile(&mut self, options: &EmitOptions) -> Result<&CompiledOutput, ConfigError> {
        match self.cache.take() {
            Some(cached) if !self.dirty => Ok(self.cache.insert(cached)),
            _ => {
                let output = compile_config(&self.config, &self.salt, options)?;
                self.dirty = false;
                Ok(self.cache.insert(output))
            }
        }
    }
}
