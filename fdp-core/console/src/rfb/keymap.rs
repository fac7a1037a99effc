//! 字符到 X11 keysym 的映射
//!
//! RFB 按键事件携带 X11 keysym。可打印 ASCII 字符的 keysym 即其
//! 码点（大小写与符号无需额外的 Shift 处理，keysym 本身已区分）。

/// 字符对应的 keysym
pub fn char_keysym(ch: char) -> Option<u32> {
    match ch {
        ' '..='~' => Some(ch as u32),
        '\n' | '\r' => Some(keysym::ENTER),
        '\t' => Some(keysym::TAB),
        _ => None,
    }
}

/// 常用 keysym 常量
pub mod keysym {
    pub const BACKSPACE: u32 = 0xFF08;
    pub const TAB: u32 = 0xFF09;
    pub const ENTER: u32 = 0xFF0D;
    pub const ESCAPE: u32 = 0xFF1B;

    pub const F1: u32 = 0xFFBE;
    pub const F2: u32 = 0xFFBF;

    pub const UP: u32 = 0xFF52;
    pub const DOWN: u32 = 0xFF54;
    pub const LEFT: u32 = 0xFF51;
    pub const RIGHT: u32 = 0xFF53;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_ascii() {
        assert_eq!(char_keysym('a'), Some(0x61));
        assert_eq!(char_keysym('A'), Some(0x41));
        assert_eq!(char_keysym('!'), Some(0x21));
        assert_eq!(char_keysym('9'), Some(0x39));
    }

    #[test]
    fn test_control_chars() {
        assert_eq!(char_keysym('\n'), Some(keysym::ENTER));
        assert_eq!(char_keysym('\t'), Some(keysym::TAB));
        assert_eq!(char_keysym('\u{1b}'), None);
    }
}
