use shared::domain::{DraftField, Talk};

use super::events::Transition;

/// The in-progress, unsubmitted talk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub description: String,
    pub speaker_name: String,
    pub speaker_bio: String,
}

impl Draft {
    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::Name => &self.name,
            DraftField::Description => &self.description,
            DraftField::SpeakerName => &self.speaker_name,
            DraftField::SpeakerBio => &self.speaker_bio,
        }
    }

    fn set(&mut self, field: DraftField, value: String) {
        let slot = match field {
            DraftField::Name => &mut self.name,
            DraftField::Description => &mut self.description,
            DraftField::SpeakerName => &mut self.speaker_name,
            DraftField::SpeakerBio => &mut self.speaker_bio,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TalkState {
    pub error: bool,
    pub talks: Vec<Talk>,
    pub draft: Draft,
}

/// Applies one transition. This is the only place controller state changes.
pub fn reduce(mut state: TalkState, transition: Transition) -> TalkState {
    match transition {
        Transition::Set(talks) => state.talks = talks,
        Transition::Add(talk) => state.talks.push(talk),
        Transition::Error => state.error = true,
        Transition::UpdateField { field, value } => state.draft.set(field, value),
    }
    state
}
