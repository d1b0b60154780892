//! Canned replies used when the completion provider is unavailable

const GREETING: &str = "สวัสดีครับ! ยินดีต้อนรับสู่ AI Chatbot ของเรา 😊";
const NAME: &str = "ฉันชื่อ AI Chatbot ครับ! ยินดีที่ได้รู้จักคุณ";
const HELP: &str = "ฉันสามารถช่วยตอบคำถามทั่วไปได้ครับ ลองถามอะไรก็ได้!";
const THANKS: &str = "ยินดีครับ! มีอะไรให้ช่วยอีกไหมครับ?";
const FAREWELL: &str = "ลาก่อนครับ! ขอให้มีวันที่ดีนะครับ 👋";
const NOT_UNDERSTOOD: &str = "ขออภัยครับ ฉันยังไม่เข้าใจคำถามนี้ ลองถามใหม่ได้ไหมครับ?";

/// Trigger phrases, checked in order. The first rule with a matching phrase
/// wins.
const RULES: [(&[&str], &str); 5] = [
    (GREETING_TRIGGERS, GREETING),
    (NAME_TRIGGERS, NAME),
    (HELP_TRIGGERS, HELP),
    (THANKS_TRIGGERS, THANKS),
    (FAREWELL_TRIGGERS, FAREWELL),
];

const GREETING_TRIGGERS: &[&str] = &["สวัสดี", "hello"];
const NAME_TRIGGERS: &[&str] = &["ชื่ออะไร", "what's your name"];
const HELP_TRIGGERS: &[&str] = &["ช่วยเหลือ", "help"];
const THANKS_TRIGGERS: &[&str] = &["ขอบคุณ", "thank"];
const FAREWELL_TRIGGERS: &[&str] = &["ลาก่อน", "bye"];

/// Keyword-matched replies. Stateless; the same text always gets the same
/// answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn new() -> Self {
        Self
    }

    pub fn respond(&self, user_text: &str) -> &'static str {
        let lowered = user_text.to_lowercase();
        RULES
            .iter()
            .find(|(triggers, _)| triggers.iter().any(|t| lowered.contains(t)))
            .map(|(_, reply)| *reply)
            .unwrap_or(NOT_UNDERSTOOD)
    }
}
