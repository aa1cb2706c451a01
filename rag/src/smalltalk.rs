pub const BOT_NAME: &str = "PantherBot";

const GREETINGS: &[&str] = &["hi", "hello", "hey", "yo", "hiya", "sup"];
const FAREWELLS: &[&str] = &["bye", "goodbye", "see you", "see ya"];

/// Conversational input that gets a canned reply instead of a catalog search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Smalltalk {
    Greeting,
    GoodMorning,
    GoodAfternoon,
    GoodEvening,
    Thanks,
    Identity,
    Farewell,
}

impl Smalltalk {
    /// Categories are tried in declaration order; the first match wins.
    pub fn classify(text: &str) -> Option<Self> {
        let q = text.trim().to_lowercase();

        if GREETINGS
            .iter()
            .any(|g| q == *g || q.strip_prefix(g).is_some_and(|rest| rest.starts_with(' ')))
        {
            return Some(Self::Greeting);
        }
        if q.contains("good morning") {
            return Some(Self::GoodMorning);
        }
        if q.contains("good afternoon") {
            return Some(Self::GoodAfternoon);
        }
        if q.contains("good evening") {
            return Some(Self::GoodEvening);
        }
        if q.contains("thank") {
            return Some(Self::Thanks);
        }
        if q.contains("who are you")
            || q.contains("what are you")
            || q.contains(&BOT_NAME.to_lowercase())
        {
            return Some(Self::Identity);
        }
        if FAREWELLS.contains(&q.as_str()) {
            return Some(Self::Farewell);
        }
        None
    }

    pub fn reply(self) -> &'static str {
        match self {
            Self::Greeting => {
                "Hello! 👋 I'm PantherBot, your UWM course assistant. \
                 Ask me about courses, prerequisites, credits, or degree requirements."
            }
            Self::GoodMorning => "Good morning! ☀️ How can I help you with UWM courses today?",
            Self::GoodAfternoon => "Good afternoon! 😄 What course information are you looking for?",
            Self::GoodEvening => "Good evening! 🌙 Need help with any UWM course details?",
            Self::Thanks => "You’re welcome! 😊 Let me know if you want to look up another course.",
            Self::Identity => {
                "I’m PantherBot, a UWM course assistant chatbot. I can help you find \
                 information about courses, prerequisites, credits, and program requirements."
            }
            Self::Farewell => "Bye! 👋 Good luck with your classes at UWM!",
        }
    }
}

/// Canned reply for conversational input, if any.
pub fn smalltalk_reply(text: &str) -> Option<&'static str> {
    Smalltalk::classify(text).map(Smalltalk::reply)
}
