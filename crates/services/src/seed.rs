//! Sample cybersecurity catalog for fresh installs and demos.

use aware_core::model::{
    AnswerDraft, AssessmentDraft, Difficulty, LearningModule, ModuleDraft, ModuleId, QuestionDraft,
    Role,
};
use std::collections::HashSet;

use storage::repository::StorageError;
use tracing::{info, warn};

use crate::app_services::AppServices;
use crate::auth_service::{Registration, generate_secret};
use crate::badge_service::BadgeDraft;
use crate::error::{AuthError, SeedError};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@cyberaware.local";
const GENERATED_PASSWORD_LEN: usize = 16;

struct SeedQuestion {
    text: &'static str,
    answers: &'static [&'static str],
    correct: usize,
    explanation: &'static str,
}

struct SeedModule {
    title: &'static str,
    description: &'static str,
    difficulty: Difficulty,
    content: &'static str,
    section_count: u32,
    points: u32,
    quiz: &'static [SeedQuestion],
    badge: (&'static str, &'static str),
}

const CATALOG: &[SeedModule] = &[
    SeedModule {
        title: "Phishing Awareness",
        description: "Recognise and report fraudulent emails, texts and calls.",
        difficulty: Difficulty::Beginner,
        content: "## What is phishing?\n\nAttackers impersonate trusted senders to steal credentials.\n\n\
                  ## Warning signs\n\nUrgency, mismatched sender domains, unexpected attachments.\n\n\
                  ## Reporting\n\nUse the report button; never reply or click through.",
        section_count: 3,
        points: 100,
        quiz: &[
            SeedQuestion {
                text: "An email from 'IT Support' asks you to confirm your password via a link. What do you do?",
                answers: &["Click the link and confirm", "Report it as phishing", "Reply asking if it is real"],
                correct: 1,
                explanation: "IT will never ask for your password by email.",
            },
            SeedQuestion {
                text: "Which sender address is most suspicious for your bank?",
                answers: &["alerts@yourbank.com", "support@yourbank-secure-login.net"],
                correct: 1,
                explanation: "Look-alike domains are a classic phishing trick.",
            },
            SeedQuestion {
                text: "A message creates extreme urgency ('account closed in 1 hour'). This is:",
                answers: &["A common pressure tactic", "Normal bank practice"],
                correct: 0,
                explanation: "Urgency is used to stop you from thinking.",
            },
            SeedQuestion {
                text: "How can you check where a link really goes?",
                answers: &["Hover over it to preview the URL", "Click it quickly", "Trust the link text"],
                correct: 0,
                explanation: "The visible text can differ from the real destination.",
            },
            SeedQuestion {
                text: "You opened a phishing attachment by mistake. What next?",
                answers: &["Ignore it", "Report it to security immediately"],
                correct: 1,
                explanation: "Fast reporting limits the damage.",
            },
        ],
        badge: ("Phish Spotter", "Completed Phishing Awareness."),
    },
    SeedModule {
        title: "Password Security",
        description: "Build strong passphrases and use a password manager and MFA.",
        difficulty: Difficulty::Beginner,
        content: "## Passphrases\n\nLength beats complexity.\n\n\
                  ## Password managers\n\nOne unique password per site.\n\n\
                  ## Multi-factor authentication\n\nA second factor stops most account takeovers.",
        section_count: 3,
        points: 100,
        quiz: &[
            SeedQuestion {
                text: "Which password is strongest?",
                answers: &["P@ssw0rd!", "correct-horse-battery-staple-42", "Summer2024"],
                correct: 1,
                explanation: "Long passphrases resist guessing best.",
            },
            SeedQuestion {
                text: "Reusing one password across sites is:",
                answers: &["Fine if it is strong", "Risky, one breach exposes every account"],
                correct: 1,
                explanation: "Credential stuffing replays leaked passwords elsewhere.",
            },
            SeedQuestion {
                text: "What does MFA add?",
                answers: &["A second proof of identity", "A longer password"],
                correct: 0,
                explanation: "Something you have or are, besides something you know.",
            },
        ],
        badge: ("Password Pro", "Completed Password Security."),
    },
    SeedModule {
        title: "Social Engineering",
        description: "Spot pretexting, tailgating and phone-based manipulation.",
        difficulty: Difficulty::Intermediate,
        content: "## Pretexting\n\nA believable story to extract information.\n\n\
                  ## Physical access\n\nTailgating and badge cloning.\n\n\
                  ## Vishing\n\nVoice calls that impersonate colleagues or vendors.",
        section_count: 3,
        points: 150,
        quiz: &[
            SeedQuestion {
                text: "Someone without a badge follows you through a secure door. You should:",
                answers: &["Hold the door to be polite", "Ask them to badge in or contact security"],
                correct: 1,
                explanation: "Tailgating bypasses physical access control.",
            },
            SeedQuestion {
                text: "A caller claiming to be the CEO asks for an urgent wire transfer. You:",
                answers: &["Send it right away", "Verify through a known channel first"],
                correct: 1,
                explanation: "Always verify unusual requests out of band.",
            },
            SeedQuestion {
                text: "Pretexting relies mainly on:",
                answers: &["A fabricated scenario", "Malware"],
                correct: 0,
                explanation: "The attacker invents a plausible reason to ask.",
            },
        ],
        badge: ("People Shield", "Completed Social Engineering."),
    },
    SeedModule {
        title: "Safe Browsing",
        description: "Browse securely: HTTPS, downloads, public Wi-Fi and updates.",
        difficulty: Difficulty::Intermediate,
        content: "## HTTPS\n\nThe padlock means encrypted, not trustworthy.\n\n\
                  ## Downloads\n\nOnly from official sources.\n\n\
                  ## Public Wi-Fi\n\nUse a VPN and avoid sensitive logins.",
        section_count: 3,
        points: 150,
        quiz: &[
            SeedQuestion {
                text: "A padlock icon in the address bar guarantees the site is:",
                answers: &["Legitimate", "Using an encrypted connection"],
                correct: 1,
                explanation: "Phishing sites use HTTPS too.",
            },
            SeedQuestion {
                text: "A pop-up says your computer is infected and offers a download. You:",
                answers: &["Download the cleaner", "Close the page and run your own antivirus"],
                correct: 1,
                explanation: "Fake alerts are a common malware lure.",
            },
            SeedQuestion {
                text: "On café Wi-Fi, the safest choice is to:",
                answers: &["Use a VPN", "Log in to online banking"],
                correct: 0,
                explanation: "Open networks can be intercepted.",
            },
        ],
        badge: ("Safe Surfer", "Completed Safe Browsing."),
    },
];

const GENERAL_BADGES: &[(&str, &str)] = &[
    ("First Steps", "Joined the awareness programme."),
    ("Security Champion", "Awarded by an instructor for outstanding work."),
];

/// Counts of what a seeding run created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub modules: usize,
    pub assessments: usize,
    pub badges: usize,
    pub admin_created: bool,
    /// Set only when the admin account was created with a generated password.
    pub generated_admin_password: Option<String>,
}

/// Insert the sample catalog and an admin account.
///
/// Every catalog entry is matched by title (modules) or name (badges), so a
/// rerun fills in whatever an interrupted run left out and creates nothing
/// else. An existing admin account is left untouched. Without
/// `admin_password` a random one is generated for a new admin account.
///
/// # Errors
///
/// Returns `SeedError` if any lookup or insert fails.
pub async fn seed_catalog(
    services: &AppServices,
    passing_score: u32,
    admin_password: Option<&str>,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();
    seed_admin(services, admin_password, &mut report).await?;

    let mut modules = services.modules().list().await?;
    let mut badge_names: HashSet<String> = services
        .badges()
        .list()
        .await?
        .iter()
        .map(|b| b.name().to_string())
        .collect();

    for (position, entry) in CATALOG.iter().enumerate() {
        let existing = modules
            .iter()
            .find(|m| m.title() == entry.title)
            .map(LearningModule::id);
        let module_id = match existing {
            Some(id) => id,
            None => {
                let module = services
                    .modules()
                    .create(ModuleDraft {
                        title: entry.title.into(),
                        description: entry.description.into(),
                        difficulty: entry.difficulty,
                        content: entry.content.into(),
                        order_index: u32::try_from(position + 1).unwrap_or(u32::MAX),
                        section_count: entry.section_count,
                        points: entry.points,
                    })
                    .await?;
                report.modules += 1;
                let id = module.id();
                modules.push(module);
                id
            }
        };

        if services.assessments().for_module(module_id).await?.is_none() {
            services
                .assessments()
                .create(quiz_draft(module_id, entry, passing_score))
                .await?;
            report.assessments += 1;
        }

        let (name, description) = entry.badge;
        if badge_names.insert(name.to_string()) {
            services
                .badges()
                .create(BadgeDraft {
                    name: name.into(),
                    description: description.into(),
                    image_url: None,
                    module_id: Some(module_id),
                })
                .await?;
            report.badges += 1;
        }
    }

    for (name, description) in GENERAL_BADGES {
        if badge_names.insert((*name).to_string()) {
            services
                .badges()
                .create(BadgeDraft {
                    name: (*name).into(),
                    description: (*description).into(),
                    ..BadgeDraft::default()
                })
                .await?;
            report.badges += 1;
        }
    }

    if report.modules + report.assessments + report.badges == 0 {
        warn!("sample catalog already present, nothing to seed");
    } else {
        info!(
            modules = report.modules,
            assessments = report.assessments,
            badges = report.badges,
            "seeded sample catalog"
        );
    }
    Ok(report)
}

async fn seed_admin(
    services: &AppServices,
    admin_password: Option<&str>,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    if services.auth().account_exists(ADMIN_USERNAME).await? {
        info!("admin account already exists");
        return Ok(());
    }

    let (password, generated) = match admin_password {
        Some(password) => (password.to_string(), false),
        None => (
            generate_secret()
                .chars()
                .take(GENERATED_PASSWORD_LEN)
                .collect::<String>(),
            true,
        ),
    };

    match services
        .auth()
        .register_with_role(
            Registration {
                username: ADMIN_USERNAME.into(),
                email: ADMIN_EMAIL.into(),
                password: password.clone(),
                ..Registration::default()
            },
            Role::Admin,
        )
        .await
    {
        Ok(_) => {
            report.admin_created = true;
            if generated {
                report.generated_admin_password = Some(password);
            }
        }
        // Another process created it between the lookup and the insert.
        Err(AuthError::Storage(StorageError::Conflict)) => {
            info!("admin account already exists");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn quiz_draft(module_id: ModuleId, entry: &SeedModule, passing_score: u32) -> AssessmentDraft {
    AssessmentDraft {
        module_id,
        title: format!("{} Check", entry.title),
        passing_score,
        time_limit_secs: Some(600),
        questions: entry
            .quiz
            .iter()
            .map(|q| QuestionDraft {
                text: q.text.into(),
                explanation: Some(q.explanation.into()),
                answers: q
                    .answers
                    .iter()
                    .enumerate()
                    .map(|(i, text)| AnswerDraft {
                        text: (*text).into(),
                        is_correct: i == q.correct,
                    })
                    .collect(),
            })
            .collect(),
    }
}
