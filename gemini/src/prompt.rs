use qtube_protocol::VideoData;

pub const UNKNOWN_VIDEO_TITLE: &str = "Unknown Video";

/// Description used when the transcript was pasted by the user rather than
/// read from the page.
pub const MANUAL_TRANSCRIPT_DESCRIPTION: &str =
    "No description available. The transcript below was supplied manually by the viewer.";

const FORMAT_INSTRUCTIONS: &str = "\
Instructions:
- Answer using only the transcript above. If it does not cover the question, say so.
- Start with a concise summary that directly answers the question.
- Cite the moments that support your answer as timestamps, each on its own line, exactly in the form:
[MM:SS] - short description
- Do not put timestamps anywhere else in the answer.";

/// Builds the prompt that grounds the model in one video's transcript.
pub fn compose_grounding_prompt(video: &VideoData, question: &str) -> String {
    let title = match video.video_title.trim() {
        "" => UNKNOWN_VIDEO_TITLE,
        title => title,
    };
    let description = video.video_description.trim();
    let transcript = video.video_transcript.trim();
    let question = question.trim();

    format!(
        "You are answering a question about a YouTube video.\n\n\
         Video title: {title}\n\
         Video description: {description}\n\n\
         Transcript:\n{transcript}\n\n\
         Question: {question}\n\n\
         {FORMAT_INSTRUCTIONS}\n"
    )
}
