use serde::Serialize;

use crate::types::StyleDeclaration;

/// 指纹输入的规范序列化形状：键序即书写序
#[derive(Serialize)]
struct Fingerprint<'a> {
    key: &'a str,
    declaration: &'a StyleDeclaration,
    salt: &'a str,
}

/// 基于声明内容生成稳定类名
///
/// `"ct_" + 8 位 base36`，对 `{key, declaration, salt}` 的规范 JSON
/// 序列化做 32 位滚动乘法散列（djb2：种子 5381，乘 33 异或字节）。
/// 同样的输入永远得到同样的类名；编译期与运行时共用这一个函数，
/// salt 用模块 id（运行时用 "runtime"）区分不相关模块里的同名键。
///
/// 32 位截断到 8 位 base36 不保证无碰撞，这是记录在案的已知限制。
pub fn fingerprint_class_name(key: &str, declaration: &StyleDeclaration, salt: &str) -> String {
    let canonical = serde_json::to_string(&Fingerprint {
        key,
        declaration,
        salt,
    })
    .unwrap_or_default();

    let mut hash: u32 = 5381;
    for byte in canonical.bytes() {
        hash = hash.wrapping_mul(33) ^ u32::from(byte);
    }

    // u32 的 base36 至多 7 位，左侧补 0 到固定 8 位
    format!("ct_{:0>8}", to_base36(hash))
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = [0u8; 7];
    let mut at = buf.len();
    while value > 0 {
        at -= 1;
        buf[at] = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    String::from_utf8_lossy(&buf[at..]).into_owned()
}
