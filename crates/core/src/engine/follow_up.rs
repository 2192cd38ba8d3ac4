//! Follow-up questions for detected symptoms.

pub const MAX_FOLLOW_UP_QUESTIONS: usize = 3;

const QUESTIONS: &[(&str, &[&str])] = &[
    (
        "chest pain",
        &[
            "How long have you had this chest pain?",
            "Does the pain worsen with movement or breathing?",
            "Are you experiencing any shortness of breath?",
            "Does the pain radiate to your arm, jaw, or back?",
        ],
    ),
    (
        "fever",
        &[
            "What's your temperature?",
            "How long have you had the fever?",
            "Are you experiencing chills or sweating?",
            "Do you have any other symptoms like cough or sore throat?",
        ],
    ),
    (
        "headache",
        &[
            "Where exactly is the headache located?",
            "How severe is the pain on a scale of 1-10?",
            "What makes it better or worse?",
            "Do you have any visual changes or nausea?",
        ],
    ),
];

/// Questions to ask next, in fixed symptom order (chest pain, fever, headache), capped at three.
pub fn follow_up_questions<S: AsRef<str>>(symptoms: &[S]) -> Vec<String> {
    let lowered: Vec<String> = symptoms
        .iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .collect();

    QUESTIONS
        .iter()
        .filter(|(symptom, _)| lowered.iter().any(|s| s == symptom))
        .flat_map(|(_, questions)| questions.iter())
        .take(MAX_FOLLOW_UP_QUESTIONS)
        .map(|q| (*q).to_owned())
        .collect()
}
