//! The portal's message-compose workflow.
//!
//! Step order mirrors the portal UI: open the message center, compose,
//! narrow down category and subcategory, fill in the appeal details, then
//! submit twice (form, then confirmation dialog). The category steps are
//! required because the submit button does not exist until they land; the
//! radio button and free-text fields have portal-side defaults, so losing
//! them still produces a submittable form.

use submit_flow::{NavigationStep, Workflow};

use crate::config::AppConfig;

pub fn message_compose_workflow(config: &AppConfig) -> Workflow {
    let submission = &config.submission;
    Workflow::new(
        "message-compose-submit",
        vec![
            NavigationStep::click("tcp-nav-messages-hdr-responsive", "open message center"),
            NavigationStep::click("btnComposeMessage", "compose new message"),
            NavigationStep::click("ddlNewMsgCat_button", "open category dropdown"),
            NavigationStep::click("ddlNewMsgCat_option-14", "select appeals category"),
            NavigationStep::click("ddlNewMsgCatSub_button", "open subcategory dropdown"),
            NavigationStep::click("ddlNewMsgCatSub_option-0", "select first subcategory"),
            NavigationStep::click("rbtnAppealType-appealGreivance-1", "choose appeal type")
                .optional(),
            NavigationStep::fill(
                "txtEmail-appealGreivance",
                "contact email",
                &submission.contact_email,
            )
            .optional(),
            NavigationStep::fill(
                "txtAddDetail-appealGreivance",
                "appeal details",
                &submission.detail_text,
            )
            .optional(),
            NavigationStep::click("mcv2-griev-appeal-submit", "submit appeal form"),
            NavigationStep::click("btnSubmitMsg", "confirm submission"),
        ],
    )
}
