//! GraphQL documents sent to `POST /graphql`.

/// Ten most recently created discussions with up to ten labels each.
pub const RECENT_DISCUSSIONS_QUERY: &str = r"
    query RepoDiscussions($owner: String!, $name: String!) {
        repository(owner: $owner, name: $name) {
            discussions(first: 10, orderBy: {field: CREATED_AT, direction: DESC}) {
                nodes {
                    id
                    number
                    title
                    body
                    category {
                        name
                    }
                    labels(first: 10) {
                        nodes {
                            name
                        }
                    }
                }
            }
        }
    }
";

/// Node id of a discussion, by public number.
pub const DISCUSSION_ID_QUERY: &str = r"
    query DiscussionId($owner: String!, $repo: String!, $number: Int!) {
        repository(owner: $owner, name: $repo) {
            discussion(number: $number) {
                id
            }
        }
    }
";

/// First hundred repository labels.
pub const REPOSITORY_LABELS_QUERY: &str = r"
    query RepositoryLabels($owner: String!, $repo: String!) {
        repository(owner: $owner, name: $repo) {
            labels(first: 100) {
                nodes {
                    id
                    name
                }
            }
        }
    }
";

/// Attach labels to a discussion; echoes the resulting label set.
pub const ADD_LABELS_MUTATION: &str = r"
    mutation AddLabelsToDiscussion($labelableId: ID!, $labelIds: [ID!]!) {
        addLabelsToLabelable(input: {labelableId: $labelableId, labelIds: $labelIds}) {
            clientMutationId
            labelable {
                ... on Discussion {
                    labels(first: 10) {
                        nodes {
                            name
                        }
                    }
                }
            }
        }
    }
";
